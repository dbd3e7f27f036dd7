//! # Terminal Rendering
//!
//! Plain-text views of a month of tides: a calendar grid with scrubbing
//! ratings, a per-day event listing and the ranked list of scrubbing days.
//! Each `render_*` function returns a `String` so output can be tested; the
//! `draw_*` wrappers print to stdout.

use crate::lunar::LunarCycle;
use crate::scrubbing::{rank_assessments, Rating, ScrubbingAssessment};
use crate::{EventKind, TideEvent};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

const CELL_WIDTH: usize = 7;

/// Short marker for a calendar cell.
fn rating_mark(rating: Option<Rating>) -> &'static str {
    match rating {
        Some(Rating::Excellent) => "***",
        Some(Rating::Good) => "**",
        Some(Rating::Fair) => "*",
        Some(Rating::Poor) | None => "",
    }
}

/// Month grid, Monday first. Each day shows its rating stars; `~` marks a
/// day whose events are predicted rather than from the Admiralty feed.
pub fn render_calendar(
    first: NaiveDate,
    days_in_month: u32,
    events: &[TideEvent],
    assessments: &BTreeMap<NaiveDate, ScrubbingAssessment>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:^width$}\n",
        first.format("%B %Y").to_string(),
        width = CELL_WIDTH * 7
    ));
    for name in ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"] {
        out.push_str(&format!("{:<width$}", name, width = CELL_WIDTH));
    }
    out.push('\n');

    let lead = first.weekday().num_days_from_monday() as usize;
    let mut line = " ".repeat(lead * CELL_WIDTH);
    let mut column = lead;

    for offset in 0..days_in_month {
        let date = first + Duration::days(i64::from(offset));
        let predicted = events
            .iter()
            .any(|e| e.date() == date && e.is_predicted);
        let mark = rating_mark(assessments.get(&date).map(|a| a.rating));
        let cell = format!(
            "{:>2}{}{}",
            date.day(),
            if predicted { "~" } else { " " },
            mark
        );
        line.push_str(&format!("{:<width$}", cell, width = CELL_WIDTH));
        column += 1;

        if column == 7 {
            out.push_str(line.trim_end());
            out.push('\n');
            line.clear();
            column = 0;
        }
    }
    if !line.is_empty() {
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out.push_str("\n*** Excellent  ** Good  * Fair  ~ predicted\n");
    out
}

/// Events grouped by day, with the Moon's phase for each day.
pub fn render_events(events: &[TideEvent], cycle: &LunarCycle) -> String {
    let mut by_date: BTreeMap<NaiveDate, Vec<&TideEvent>> = BTreeMap::new();
    for event in events {
        by_date.entry(event.date()).or_default().push(event);
    }

    let mut out = String::new();
    for (date, day_events) in by_date {
        let midnight = crate::predictor::utc_midnight(date);
        let noon = midnight
            .checked_add_signed(Duration::hours(12))
            .unwrap_or(midnight);
        let phase = cycle.moon_phase(noon);
        out.push_str(&format!(
            "{}  {}{}\n",
            date.format("%a %d %b"),
            phase.name(),
            if phase.is_spring() { " (springs)" } else { "" }
        ));
        for event in day_events {
            let kind = match event.kind {
                EventKind::HighWater => "HW",
                EventKind::LowWater => "LW",
            };
            out.push_str(&format!(
                "    {} {}  {:>5.2} m  {}\n",
                kind,
                event.timestamp.format("%H:%M"),
                event.height,
                event.source
            ));
        }
    }
    out
}

/// Scrubbing days, best first.
pub fn render_ranked(assessments: &BTreeMap<NaiveDate, ScrubbingAssessment>) -> String {
    if assessments.is_empty() {
        return "No suitable scrubbing days in this period.\n".to_string();
    }

    let mut out = String::new();
    for (date, a) in rank_assessments(assessments) {
        let refloat = a
            .refloat_estimate
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string());
        out.push_str(&format!(
            "{:<3} {:<9} {}  HW {} {:.2} m -> LW {} {:.2} m  range {:.2} m  refloat {}{}\n",
            a.rating.stars(),
            a.rating.label(),
            date.format("%a %d %b"),
            a.high_water_time().format("%H:%M"),
            a.high_water.height,
            a.low_water_time().format("%H:%M"),
            a.low_water.height,
            a.tidal_range,
            refloat,
            if a.is_predicted() { "  [predicted]" } else { "" }
        ));
    }
    out
}

pub fn draw_calendar(
    first: NaiveDate,
    days_in_month: u32,
    events: &[TideEvent],
    assessments: &BTreeMap<NaiveDate, ScrubbingAssessment>,
) {
    print!("{}", render_calendar(first, days_in_month, events, assessments));
}

pub fn draw_events(events: &[TideEvent], cycle: &LunarCycle) {
    print!("{}", render_events(events, cycle));
}

pub fn draw_ranked(assessments: &BTreeMap<NaiveDate, ScrubbingAssessment>) {
    print!("{}", render_ranked(assessments));
}

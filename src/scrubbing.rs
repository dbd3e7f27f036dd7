//! # Scrubbing Window Analyzer
//!
//! Rates each calendar day for drying a boat out to scrub the hull:
//!
//! 1. Beach the boat on a high water inside the owner's preferred clock window
//! 2. Work while the tide drops to the following low water
//! 3. Refloat on the next high water, ideally before 20:00
//!
//! A bigger range between the beaching high water and the following low
//! water exposes more of the hull, so ranges of 4.5 m and 3.5 m are the
//! thresholds for "Excellent" and "Good". Anything else that still has a
//! qualifying high water is "Fair". Days with no high water in the window are
//! left out of the result entirely.

use crate::{Result, TideError, TideEvent};
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Range at or above which a day is Excellent (metres).
pub const EXCELLENT_RANGE_M: f64 = 4.5;
/// Range at or above which a day is Good (metres).
pub const GOOD_RANGE_M: f64 = 3.5;
/// Refloating at or after this hour (UTC) counts as refloating after dark.
pub const REFLOAT_CUTOFF_HOUR: u32 = 20;
/// High waters closer than this on the same day belong to the same tide.
const SAME_TIDE_HOURS: i64 = 6;

/// Suitability of a day, best first.
///
/// `Poor` belongs to the shared display vocabulary but is never produced by
/// [`assess_scrubbing_days`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Rating {
    pub fn label(&self) -> &'static str {
        match self {
            Rating::Excellent => "Excellent",
            Rating::Good => "Good",
            Rating::Fair => "Fair",
            Rating::Poor => "Not Ideal",
        }
    }

    pub fn stars(&self) -> &'static str {
        match self {
            Rating::Excellent => "★★★",
            Rating::Good => "★★",
            Rating::Fair => "★",
            Rating::Poor => "—",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rate a beaching opportunity from its range and whether it refloats in daylight.
pub fn rate(tidal_range: f64, refloat_ok: bool) -> Rating {
    if tidal_range >= EXCELLENT_RANGE_M && refloat_ok {
        Rating::Excellent
    } else if tidal_range >= GOOD_RANGE_M && refloat_ok {
        Rating::Good
    } else {
        Rating::Fair
    }
}

/// Accepted clock times for the beaching high water, as inclusive
/// minutes-of-day. `start > end` is an empty window, not a wraparound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrubWindowPreference {
    pub window_start: u32,
    pub window_end: u32,
}

impl Default for ScrubWindowPreference {
    /// 06:30 to 09:00
    fn default() -> Self {
        Self {
            window_start: 6 * 60 + 30,
            window_end: 9 * 60,
        }
    }
}

impl ScrubWindowPreference {
    pub fn new(window_start: u32, window_end: u32) -> Self {
        Self {
            window_start,
            window_end,
        }
    }

    /// Build from two `HH:MM` strings.
    ///
    /// ```
    /// use scrub_tide_lib::scrubbing::ScrubWindowPreference;
    ///
    /// let pref = ScrubWindowPreference::from_hhmm("06:30", "09:00").unwrap();
    /// assert_eq!(pref, ScrubWindowPreference::new(390, 540));
    /// ```
    pub fn from_hhmm(start: &str, end: &str) -> Result<Self> {
        Ok(Self::new(parse_hhmm(start)?, parse_hhmm(end)?))
    }

    pub fn contains(&self, minute_of_day: u32) -> bool {
        minute_of_day >= self.window_start && minute_of_day <= self.window_end
    }
}

/// Parse `HH:MM` (24-hour) into minutes since midnight.
pub fn parse_hhmm(text: &str) -> Result<u32> {
    let invalid = || TideError::InvalidTime(text.to_string());
    let (hours, minutes) = text.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

/// Format minutes since midnight as `HH:MM`.
pub fn format_hhmm(minute_of_day: u32) -> String {
    format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
}

/// Best scrubbing opportunity found for one calendar day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScrubbingAssessment {
    pub rating: Rating,
    /// High water the boat is beached on
    pub high_water: TideEvent,
    /// First low water after `high_water`
    pub low_water: TideEvent,
    /// High water used to refloat; `None` at the end of the data
    pub next_high_water: Option<TideEvent>,
    /// `high_water.height - low_water.height`, not clamped
    pub tidal_range: f64,
    pub refloat_estimate: Option<DateTime<Utc>>,
}

impl ScrubbingAssessment {
    pub fn high_water_time(&self) -> DateTime<Utc> {
        self.high_water.timestamp
    }

    pub fn low_water_time(&self) -> DateTime<Utc> {
        self.low_water.timestamp
    }

    /// True when any event the assessment relies on is a prediction.
    pub fn is_predicted(&self) -> bool {
        self.high_water.is_predicted
            || self.low_water.is_predicted
            || self
                .next_high_water
                .as_ref()
                .is_some_and(|hw| hw.is_predicted)
    }
}

/// Rate every calendar date in `events` against `preference`.
///
/// `events` must be sorted by time. Low and refloat high waters are looked up
/// across the whole list, so a late high water can pair with the next day's
/// low water.
pub fn assess_scrubbing_days(
    events: &[TideEvent],
    preference: &ScrubWindowPreference,
) -> BTreeMap<NaiveDate, ScrubbingAssessment> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&TideEvent>> = BTreeMap::new();
    for event in events {
        by_date.entry(event.date()).or_default().push(event);
    }

    let mut results: BTreeMap<NaiveDate, ScrubbingAssessment> = BTreeMap::new();

    for (date, day_events) in by_date {
        for hw in day_events.iter().filter(|e| e.is_high_water()) {
            if !preference.contains(hw.minute_of_day()) {
                continue;
            }
            let Some(candidate) = assess_high_water(events, hw) else {
                continue;
            };

            let replace = match results.get(&date) {
                None => true,
                Some(existing) => {
                    candidate.rating == Rating::Excellent
                        || (candidate.rating == Rating::Good
                            && existing.rating != Rating::Excellent)
                }
            };
            if replace {
                results.insert(date, candidate);
            }
        }
    }

    results
}

fn assess_high_water(events: &[TideEvent], hw: &TideEvent) -> Option<ScrubbingAssessment> {
    let low_water = events
        .iter()
        .find(|e| e.is_low_water() && e.timestamp > hw.timestamp)?;

    let next_high_water = events.iter().find(|e| {
        e.is_high_water()
            && e.timestamp > hw.timestamp
            && (e.date() != hw.date()
                || e.timestamp - hw.timestamp > Duration::hours(SAME_TIDE_HOURS))
    });

    let tidal_range = hw.height - low_water.height;
    let refloat_ok =
        next_high_water.map_or(true, |next| next.timestamp.hour() < REFLOAT_CUTOFF_HOUR);

    Some(ScrubbingAssessment {
        rating: rate(tidal_range, refloat_ok),
        high_water: hw.clone(),
        low_water: low_water.clone(),
        next_high_water: next_high_water.cloned(),
        tidal_range,
        refloat_estimate: next_high_water.map(|next| next.timestamp),
    })
}

/// Order assessments for a ranked list: best rating first, then by date.
pub fn rank_assessments(
    assessments: &BTreeMap<NaiveDate, ScrubbingAssessment>,
) -> Vec<(NaiveDate, &ScrubbingAssessment)> {
    let mut ranked: Vec<_> = assessments.iter().map(|(d, a)| (*d, a)).collect();
    ranked.sort_by_key(|(date, assessment)| (assessment.rating, *date));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventKind;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0).unwrap()
    }

    fn hw(day: u32, hour: u32, minute: u32, height: f64) -> TideEvent {
        TideEvent::predicted(EventKind::HighWater, at(day, hour, minute), height)
    }

    fn lw(day: u32, hour: u32, minute: u32, height: f64) -> TideEvent {
        TideEvent::predicted(EventKind::LowWater, at(day, hour, minute), height)
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn morning_day(high: f64) -> Vec<TideEvent> {
        vec![
            hw(10, 7, 0, high),
            lw(10, 13, 10, 0.3),
            hw(10, 19, 25, high - 0.1),
            lw(11, 1, 35, 0.4),
        ]
    }

    #[test]
    fn test_rating_thresholds() {
        let pref = ScrubWindowPreference::from_hhmm("06:30", "09:00").unwrap();

        let excellent = assess_scrubbing_days(&morning_day(5.0), &pref);
        let day = &excellent[&date(10)];
        assert_eq!(day.rating, Rating::Excellent);
        assert_abs_diff_eq!(day.tidal_range, 4.7, epsilon = 1e-9);
        assert_eq!(day.refloat_estimate, Some(at(10, 19, 25)));

        let good = assess_scrubbing_days(&morning_day(3.9), &pref);
        assert_eq!(good[&date(10)].rating, Rating::Good);

        let fair = assess_scrubbing_days(&morning_day(2.3), &pref);
        assert_eq!(fair[&date(10)].rating, Rating::Fair);
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let pref = ScrubWindowPreference::new(600, 300);
        assert!(assess_scrubbing_days(&morning_day(5.0), &pref).is_empty());
    }

    #[test]
    fn test_empty_events() {
        assert!(assess_scrubbing_days(&[], &ScrubWindowPreference::default()).is_empty());
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let events = morning_day(5.0);
        let exact = ScrubWindowPreference::new(420, 420);
        assert_eq!(assess_scrubbing_days(&events, &exact).len(), 1);
        let before = ScrubWindowPreference::new(300, 419);
        assert!(assess_scrubbing_days(&events, &before).is_empty());
    }

    #[test]
    fn test_late_refloat_downgrades_to_fair() {
        let events = vec![
            hw(10, 9, 0, 5.0),
            lw(10, 15, 10, 0.3),
            hw(10, 21, 20, 4.9),
        ];
        let pref = ScrubWindowPreference::from_hhmm("08:00", "10:00").unwrap();
        let result = assess_scrubbing_days(&events, &pref);
        assert_eq!(result[&date(10)].rating, Rating::Fair);
    }

    #[test]
    fn test_no_following_low_water_is_skipped() {
        let events = vec![lw(10, 1, 0, 0.5), hw(10, 7, 0, 5.0)];
        let result = assess_scrubbing_days(&events, &ScrubWindowPreference::default());
        assert!(result.is_empty());
    }

    #[test]
    fn test_last_high_water_has_no_refloat() {
        let events = vec![hw(10, 7, 0, 5.0), lw(10, 13, 10, 0.3)];
        let result = assess_scrubbing_days(&events, &ScrubWindowPreference::default());
        let day = &result[&date(10)];
        assert_eq!(day.rating, Rating::Excellent);
        assert!(day.next_high_water.is_none());
        assert!(day.refloat_estimate.is_none());
    }

    #[test]
    fn test_low_water_found_on_next_day() {
        let events = vec![
            hw(10, 23, 30, 4.6),
            lw(11, 5, 40, 0.4),
            hw(11, 11, 55, 4.5),
        ];
        let pref = ScrubWindowPreference::from_hhmm("23:00", "23:59").unwrap();
        let result = assess_scrubbing_days(&events, &pref);
        let day = &result[&date(10)];
        assert_eq!(day.low_water_time(), at(11, 5, 40));
        assert_eq!(day.refloat_estimate, Some(at(11, 11, 55)));
        assert_eq!(day.rating, Rating::Good);
    }

    #[test]
    fn test_refloat_skips_same_tide_high_water() {
        // A double high water three hours later on the same day is not a refloat
        let events = vec![
            hw(10, 7, 0, 5.0),
            hw(10, 10, 0, 4.9),
            lw(10, 13, 10, 0.3),
            hw(10, 19, 25, 4.9),
        ];
        let pref = ScrubWindowPreference::from_hhmm("06:30", "07:30").unwrap();
        let result = assess_scrubbing_days(&events, &pref);
        assert_eq!(result[&date(10)].refloat_estimate, Some(at(10, 19, 25)));
    }

    #[test]
    fn test_best_of_day_good_then_excellent() {
        let events = vec![
            hw(10, 1, 0, 4.0),
            lw(10, 7, 10, 0.3),
            hw(10, 13, 25, 5.0),
            lw(10, 19, 35, 0.3),
            hw(11, 1, 50, 4.9),
        ];
        let pref = ScrubWindowPreference::new(0, 1439);
        let result = assess_scrubbing_days(&events, &pref);
        assert_eq!(result[&date(10)].rating, Rating::Excellent);
        assert_eq!(result[&date(10)].high_water_time(), at(10, 13, 25));
    }

    #[test]
    fn test_best_of_day_excellent_then_good() {
        let events = vec![
            hw(10, 1, 0, 5.0),
            lw(10, 7, 10, 0.3),
            hw(10, 13, 25, 4.0),
            lw(10, 19, 35, 0.3),
            hw(11, 1, 50, 4.9),
        ];
        let pref = ScrubWindowPreference::new(0, 1439);
        let result = assess_scrubbing_days(&events, &pref);
        assert_eq!(result[&date(10)].rating, Rating::Excellent);
        assert_eq!(result[&date(10)].high_water_time(), at(10, 1, 0));
    }

    #[test]
    fn test_later_fair_does_not_replace_earlier_fair() {
        let events = vec![
            hw(10, 1, 0, 2.0),
            lw(10, 7, 10, 0.3),
            hw(10, 13, 25, 2.1),
            lw(10, 19, 35, 0.3),
        ];
        let pref = ScrubWindowPreference::new(0, 1439);
        let result = assess_scrubbing_days(&events, &pref);
        assert_eq!(result[&date(10)].rating, Rating::Fair);
        assert_eq!(result[&date(10)].high_water_time(), at(10, 1, 0));
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("00:00").unwrap(), 0);
        assert_eq!(parse_hhmm("23:59").unwrap(), 1439);
        assert_eq!(parse_hhmm(" 7:05 ").unwrap(), 425);
        assert!(parse_hhmm("24:00").is_err());
        assert!(parse_hhmm("12:60").is_err());
        assert!(parse_hhmm("noon").is_err());
        assert!(matches!(parse_hhmm("1230"), Err(TideError::InvalidTime(_))));
        assert_eq!(format_hhmm(425), "07:05");
    }

    #[test]
    fn test_rank_assessments_orders_by_rating_then_date() {
        let mut events = Vec::new();
        for (day, high) in [(10, 2.3), (11, 5.0), (12, 3.9), (13, 5.0)] {
            events.push(hw(day, 7, 0, high));
            events.push(lw(day, 13, 10, 0.3));
            events.push(hw(day, 19, 25, high));
        }
        let assessments = assess_scrubbing_days(&events, &ScrubWindowPreference::default());
        let ranked: Vec<_> = rank_assessments(&assessments)
            .into_iter()
            .map(|(d, a)| (d, a.rating))
            .collect();
        assert_eq!(
            ranked,
            vec![
                (date(11), Rating::Excellent),
                (date(13), Rating::Excellent),
                (date(12), Rating::Good),
                (date(10), Rating::Fair),
            ]
        );
    }

    #[test]
    fn test_rating_vocabulary() {
        assert_eq!(Rating::Poor.label(), "Not Ideal");
        assert_eq!(Rating::Excellent.stars(), "★★★");
        assert_eq!(serde_json::to_string(&Rating::Good).unwrap(), "\"good\"");
    }
}

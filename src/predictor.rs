//! # Harmonic Tide Event Predictor
//!
//! Synthesizes high and low water events when authoritative data is missing,
//! beyond the free API window, or rate limited. It is a single-constituent
//! model built around the principal lunar semidiurnal tide (M2):
//!
//! - **Timing**: the first high water of the start day is anchored to the
//!   lunar phase, then drifts ~50 minutes later each day. The second high water
//!   follows one M2 period later and low waters sit half a period after each.
//! - **Heights**: interpolated between the station's neap and spring levels
//!   using the spring/neap factor of the Moon's phase two days earlier, since
//!   the tidal response lags the astronomical forcing.
//! - **Jitter**: each height gets a small uniform perturbation so repeated
//!   predictions do not look unnaturally identical. The source is injected
//!   through [`HeightJitter`] so tests can pin it.
//!
//! ### Accuracy Trade-offs
//! - ✅ **Correct period and daily drift**
//! - ✅ **Spring–neap envelope with realistic lag**
//! - ❌ **No shallow-water constituents**: double high waters (Southampton)
//!   are not modelled
//! - ❌ **Not phase-locked to the station**: times can be hours out
//!
//! Callers should label these events as predictions.

use crate::lunar::LunarCycle;
use crate::{EventKind, StationConstants, TideEvent};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Principal lunar semidiurnal period in hours.
pub const M2_PERIOD_HOURS: f64 = 12.4206;

/// Daily lateness of the tide in hours (~50 minutes).
pub const DAILY_ADVANCE_HOURS: f64 = 0.8333;

/// Days between the astronomical spring/neap forcing and the tidal response.
pub const SPRING_NEAP_LAG_DAYS: i64 = 2;

/// Half-width of the uniform height perturbation in metres.
pub const JITTER_HALF_WIDTH_M: f64 = 0.075;

/// The second high water of a day is this much lower than the first, and the
/// second low water this much higher.
const SECOND_TIDE_STEP_M: f64 = 0.1;

/// Minimum separation in hours for a second event of a pair to be emitted.
const MIN_PAIR_SEPARATION_HOURS: f64 = 6.0;

/// Longest prediction run accepted from configuration or the command line.
pub const MAX_PREDICTION_DAYS: u32 = 366;

/// Named constants driving the model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConstants {
    #[serde(flatten)]
    pub lunar: LunarCycle,
    pub m2_period_hours: f64,
    pub daily_advance_hours: f64,
    pub spring_neap_lag_days: i64,
}

impl Default for PredictionConstants {
    fn default() -> Self {
        Self {
            lunar: LunarCycle::default(),
            m2_period_hours: M2_PERIOD_HOURS,
            daily_advance_hours: DAILY_ADVANCE_HOURS,
            spring_neap_lag_days: SPRING_NEAP_LAG_DAYS,
        }
    }
}

/// Source of the random height perturbation, in metres.
pub trait HeightJitter {
    fn offset(&mut self) -> f64;
}

/// Zero perturbation; makes prediction fully deterministic.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoJitter;

impl HeightJitter for NoJitter {
    fn offset(&mut self) -> f64 {
        0.0
    }
}

/// Uniform perturbation in `[-half_width, half_width)` drawn from any RNG.
#[derive(Clone, Debug)]
pub struct UniformJitter<R> {
    rng: R,
    half_width: f64,
}

impl<R: Rng> UniformJitter<R> {
    pub fn new(rng: R, half_width: f64) -> Self {
        Self { rng, half_width }
    }
}

impl UniformJitter<ThreadRng> {
    /// Entropy-seeded jitter with the standard ±0.075 m width.
    pub fn thread() -> Self {
        Self::new(rand::thread_rng(), JITTER_HALF_WIDTH_M)
    }
}

impl UniformJitter<StdRng> {
    /// Reproducible jitter with the standard width.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed), JITTER_HALF_WIDTH_M)
    }
}

impl<R: Rng> HeightJitter for UniformJitter<R> {
    fn offset(&mut self) -> f64 {
        (self.rng.gen::<f64>() - 0.5) * 2.0 * self.half_width
    }
}

impl<F: FnMut() -> f64> HeightJitter for F {
    fn offset(&mut self) -> f64 {
        self()
    }
}

/// Event predictor bound to a set of model constants.
#[derive(Clone, Copy, Debug, Default)]
pub struct Predictor {
    constants: PredictionConstants,
}

impl Predictor {
    pub fn new(constants: PredictionConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &PredictionConstants {
        &self.constants
    }

    /// Spring/neap factor used for heights on `date`: the factor of the lunar
    /// phase `spring_neap_lag_days` earlier. Dates whose lagged instant falls
    /// outside the calendar use their own midnight.
    pub fn lagged_spring_neap_factor(&self, date: NaiveDate) -> f64 {
        let midnight = utc_midnight(date);
        let lagged = Duration::try_days(self.constants.spring_neap_lag_days)
            .and_then(|lag| midnight.checked_sub_signed(lag))
            .unwrap_or(midnight);
        self.constants.lunar.spring_neap_factor(lagged)
    }

    /// Predict high and low waters for `days` days starting at the UTC
    /// midnight of `start`.
    ///
    /// Emits two or four events per day, sorted by time. Never fails;
    /// non-finite station constants just produce meaningless heights, and
    /// days or events past the end of the calendar are dropped.
    pub fn predict<J: HeightJitter + ?Sized>(
        &self,
        station: &StationConstants,
        start: DateTime<Utc>,
        days: u32,
        jitter: &mut J,
    ) -> Vec<TideEvent> {
        let m2 = self.constants.m2_period_hours;
        let reference = utc_midnight(start.date_naive());
        let initial_offset =
            (self.constants.lunar.phase(reference) * 24.0 * 0.5 + 2.0) % m2;

        let mut events = Vec::with_capacity(days.min(MAX_PREDICTION_DAYS) as usize * 4);

        for day in 0..days {
            let Some(current) = reference.checked_add_signed(Duration::days(i64::from(day))) else {
                break;
            };
            let factor = self.lagged_spring_neap_factor(current.date_naive());

            let high = station.mean_high_water_neaps
                + (station.mean_high_water_springs - station.mean_high_water_neaps) * factor;
            let low = station.mean_low_water_neaps
                - (station.mean_low_water_neaps - station.mean_low_water_springs) * factor;

            let mut hw1 = (initial_offset + f64::from(day) * self.constants.daily_advance_hours) % 24.0;
            if hw1 < 0.0 {
                hw1 += 24.0;
            }
            let hw2 = (hw1 + m2) % 24.0;
            let lw1 = (hw1 + m2 / 2.0) % 24.0;
            let lw2 = (hw2 + m2 / 2.0) % 24.0;

            let mut emit = |hour: f64, kind: EventKind, base: f64| {
                if !(0.0..24.0).contains(&hour) {
                    return;
                }
                let offset = Duration::hours(hour.floor() as i64)
                    + Duration::minutes((hour.fract() * 60.0).round() as i64);
                let Some(timestamp) = current.checked_add_signed(offset) else {
                    return;
                };
                let height = (base + jitter.offset()).max(0.0);
                events.push(TideEvent::predicted(kind, timestamp, height));
            };

            emit(hw1, EventKind::HighWater, high);
            if is_distinct_second(hw1, hw2) {
                emit(hw2, EventKind::HighWater, high - SECOND_TIDE_STEP_M);
            }
            emit(lw1, EventKind::LowWater, low);
            if is_distinct_second(lw1, lw2) {
                emit(lw2, EventKind::LowWater, low + SECOND_TIDE_STEP_M);
            }
        }

        events.sort_by_key(|event| event.timestamp);
        events
    }
}

/// Predict with the default model constants.
pub fn predict_events<J: HeightJitter + ?Sized>(
    station: &StationConstants,
    start: DateTime<Utc>,
    days: u32,
    jitter: &mut J,
) -> Vec<TideEvent> {
    Predictor::default().predict(station, start, days, jitter)
}

/// Validate a signed day count from configuration or the command line:
/// `0..=MAX_PREDICTION_DAYS`.
pub fn checked_days(days: i64) -> crate::Result<u32> {
    u32::try_from(days)
        .ok()
        .filter(|&d| d <= MAX_PREDICTION_DAYS)
        .ok_or(crate::TideError::InvalidDays(days))
}

/// First day of the month containing `date` and the month's length.
pub fn month_window(date: NaiveDate) -> (NaiveDate, u32) {
    let first = date.with_day(1).unwrap_or(date);
    let len = first
        .checked_add_months(Months::new(1))
        .map(|next| (next - first).num_days() as u32)
        .unwrap_or(31);
    (first, len)
}

/// Midnight UTC at the start of `date`.
pub fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

// The second member of a pair is only emitted when the modulo arithmetic put
// it on a distinct part of the day.
fn is_distinct_second(first: f64, second: f64) -> bool {
    (second - first).abs() > MIN_PAIR_SEPARATION_HOURS || second < first
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn southampton() -> StationConstants {
        StationConstants::new(4.5, 3.7, 1.8, 0.5)
    }

    fn march_first() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_zero_days_is_empty() {
        let events = predict_events(&southampton(), march_first(), 0, &mut NoJitter);
        assert!(events.is_empty());
    }

    #[test]
    fn test_southampton_reference_trace() {
        let events = predict_events(&southampton(), march_first(), 3, &mut NoJitter);

        let expected = [
            ("2025-03-01T02:26:00Z", EventKind::HighWater, 4.399637),
            ("2025-03-01T08:39:00Z", EventKind::LowWater, 0.663089),
            ("2025-03-01T14:51:00Z", EventKind::HighWater, 4.299637),
            ("2025-03-01T21:04:00Z", EventKind::LowWater, 0.763089),
            ("2025-03-02T03:16:00Z", EventKind::HighWater, 4.492000),
            ("2025-03-02T09:29:00Z", EventKind::LowWater, 0.512999),
            ("2025-03-02T15:41:00Z", EventKind::HighWater, 4.392000),
            ("2025-03-02T21:54:00Z", EventKind::LowWater, 0.612999),
            ("2025-03-03T04:06:00Z", EventKind::HighWater, 4.383638),
            ("2025-03-03T10:19:00Z", EventKind::LowWater, 0.689088),
            ("2025-03-03T16:31:00Z", EventKind::HighWater, 4.283638),
            ("2025-03-03T22:44:00Z", EventKind::LowWater, 0.789088),
        ];

        assert_eq!(events.len(), expected.len());
        for (event, (time, kind, height)) in events.iter().zip(expected) {
            let time: DateTime<Utc> = time.parse().unwrap();
            assert_eq!(event.timestamp, time);
            assert_eq!(event.kind, kind);
            assert_abs_diff_eq!(event.height, height, epsilon = 1e-4);
            assert!(event.is_predicted);
        }
    }

    #[test]
    fn test_start_is_truncated_to_midnight() {
        let late = Utc.with_ymd_and_hms(2025, 3, 1, 17, 42, 13).unwrap();
        let a = predict_events(&southampton(), march_first(), 2, &mut NoJitter);
        let b = predict_events(&southampton(), late, 2, &mut NoJitter);
        assert_eq!(a, b);
    }

    #[test]
    fn test_deterministic_without_jitter() {
        let a = predict_events(&southampton(), march_first(), 30, &mut NoJitter);
        let b = predict_events(&southampton(), march_first(), 30, &mut NoJitter);
        assert_eq!(a, b);
    }

    #[test]
    fn test_seeded_jitter_is_reproducible_and_bounded() {
        let base = predict_events(&southampton(), march_first(), 10, &mut NoJitter);
        let a = predict_events(&southampton(), march_first(), 10, &mut UniformJitter::seeded(7));
        let b = predict_events(&southampton(), march_first(), 10, &mut UniformJitter::seeded(7));
        assert_eq!(a, b);

        for (plain, jittered) in base.iter().zip(&a) {
            assert_eq!(plain.timestamp, jittered.timestamp);
            assert!((plain.height - jittered.height).abs() <= JITTER_HALF_WIDTH_M);
        }
    }

    #[test]
    fn test_closure_jitter_and_clamping() {
        let mut sink = || -10.0;
        let events = predict_events(&southampton(), march_first(), 5, &mut sink);
        assert!(events.iter().all(|e| e.height == 0.0));
    }

    #[test]
    fn test_heights_use_two_day_lagged_factor() {
        let station = southampton();
        let predictor = Predictor::default();
        let cycle = predictor.constants().lunar;
        let events = predictor.predict(&station, march_first(), 20, &mut NoJitter);

        for day in 0..20 {
            let date = march_first().date_naive() + Duration::days(day);
            let lagged = utc_midnight(date) - Duration::days(2);
            let factor = cycle.spring_neap_factor(lagged);
            assert_abs_diff_eq!(predictor.lagged_spring_neap_factor(date), factor);

            let expected_high = 3.7 + (4.5 - 3.7) * factor;
            let first_high = events
                .iter()
                .filter(|e| e.date() == date && e.is_high_water())
                .map(|e| e.height)
                .fold(f64::NEG_INFINITY, f64::max);
            assert_abs_diff_eq!(first_high, expected_high, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_lag_differs_from_same_day_factor() {
        let predictor = Predictor::default();
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let same_day = predictor.constants().lunar.spring_neap_factor(utc_midnight(date));
        assert!((predictor.lagged_spring_neap_factor(date) - same_day).abs() > 1e-3);
    }

    #[test]
    fn test_default_station_constants() {
        let events = predict_events(&StationConstants::default(), march_first(), 1, &mut NoJitter);
        let high = events.iter().find(|e| e.is_high_water()).unwrap();
        assert!(high.height >= 3.5 && high.height <= 4.5);
    }

    #[test]
    fn test_non_finite_constants_do_not_panic() {
        let station = StationConstants::new(f64::NAN, f64::INFINITY, 1.0, 0.0);
        let events = predict_events(&station, march_first(), 3, &mut NoJitter);
        assert!(!events.is_empty());

        let broken = Predictor::new(PredictionConstants {
            m2_period_hours: f64::NAN,
            ..PredictionConstants::default()
        });
        let events = broken.predict(&southampton(), march_first(), 3, &mut NoJitter);
        assert!(events.is_empty());
    }

    #[test]
    fn test_checked_days() {
        assert_eq!(checked_days(14).unwrap(), 14);
        assert!(matches!(
            checked_days(-1),
            Err(crate::TideError::InvalidDays(-1))
        ));
        assert_eq!(checked_days(366).unwrap(), MAX_PREDICTION_DAYS);
        assert!(matches!(
            checked_days(367),
            Err(crate::TideError::InvalidDays(367))
        ));
        assert!(checked_days(4_000_000_000).is_err());
    }

    #[test]
    fn test_calendar_bounds_do_not_panic() {
        let station = StationConstants::default();

        let last = predict_events(&station, utc_midnight(NaiveDate::MAX), 2, &mut NoJitter);
        assert!(last.len() <= 4);
        assert!(last.iter().all(|e| e.date() == NaiveDate::MAX));

        let first = predict_events(&station, utc_midnight(NaiveDate::MIN), 1, &mut NoJitter);
        assert!((2..=4).contains(&first.len()));
        assert!(first.iter().all(|e| e.timestamp >= utc_midnight(NaiveDate::MIN)));
    }

    #[test]
    fn test_short_period_skips_second_events() {
        let predictor = Predictor::new(PredictionConstants {
            m2_period_hours: 4.0,
            ..PredictionConstants::default()
        });
        let events = predictor.predict(&southampton(), march_first(), 1, &mut NoJitter);

        assert_eq!(events.len(), 2);
        assert_eq!(events.iter().filter(|e| e.is_high_water()).count(), 1);
        assert_eq!(events.iter().filter(|e| e.is_low_water()).count(), 1);
        assert_eq!(events[1].timestamp - events[0].timestamp, Duration::hours(2));
    }

    #[test]
    fn test_is_distinct_second_boundaries() {
        assert!(!is_distinct_second(1.0, 7.0));
        assert!(is_distinct_second(1.0, 7.5));
        assert!(!is_distinct_second(5.0, 5.0));
        assert!(!is_distinct_second(2.0, 6.0));
        // wrapped past midnight
        assert!(is_distinct_second(20.0, 8.0));
        assert!(is_distinct_second(20.0, 19.0));
    }

    #[test]
    fn test_month_window() {
        let (first, len) = month_window(NaiveDate::from_ymd_opt(2024, 2, 17).unwrap());
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(len, 29);

        let (first, len) = month_window(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(len, 31);
    }
}

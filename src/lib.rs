//! # Scrub Tide Core Library
//!
//! Tide event prediction and hull-scrubbing day planning for UK tidal stations.
//! A boat owner beaches the boat on a morning high water, works on the hull
//! while the tide is out, and refloats on the next high water. This crate
//! answers "which days this month make that possible?".
//!
//! ## Data Flow
//! 1. **Online**: Fetch Admiralty `TidalEvents` for the station → cache → normalize
//! 2. **Offline / beyond the API window**: synthesize events with the harmonic
//!    predictor in [`predictor`]
//! 3. **Merge**: authoritative events win for any calendar date they cover
//!    ([`tide_data::merge_events`])
//! 4. **Assess**: [`scrubbing::assess_scrubbing_days`] rates each date against the
//!    user's preferred high-water window
//!
//! ## Core Types
//! - [`TideEvent`]: a single high or low water, predicted or authoritative
//! - [`EventKind`]: high water or low water
//! - [`StationConstants`]: the four characteristic heights the predictor needs
//!
//! All times are UTC. Heights are metres above chart datum.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod lunar;
pub mod predictor;
pub mod renderer;
pub mod scrubbing;
pub mod stations;
pub mod tide_data;

pub use error::{Result, TideError};

/// Provenance tag for synthesized events.
pub const SOURCE_PREDICTED: &str = "Predicted";
/// Provenance tag for events from the UK Hydrographic Office feed.
pub const SOURCE_ADMIRALTY: &str = "UKHO";

/// Whether an event is a tidal maximum or minimum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    HighWater,
    LowWater,
}

/// One high or low water.
///
/// Events are created in a batch by the predictor or the feed client and are
/// never mutated afterwards. `source` is only used for display.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use scrub_tide_lib::{EventKind, TideEvent};
///
/// let hw = TideEvent::predicted(
///     EventKind::HighWater,
///     Utc.with_ymd_and_hms(2025, 3, 1, 7, 15, 0).unwrap(),
///     4.4,
/// );
/// assert_eq!(hw.minute_of_day(), 7 * 60 + 15);
/// assert!(hw.is_predicted);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideEvent {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    /// Metres above chart datum
    pub height: f64,
    /// True when synthesized rather than read from an authoritative feed
    pub is_predicted: bool,
    pub source: String,
}

impl TideEvent {
    /// Build a synthesized event tagged [`SOURCE_PREDICTED`].
    pub fn predicted(kind: EventKind, timestamp: DateTime<Utc>, height: f64) -> Self {
        Self {
            kind,
            timestamp,
            height,
            is_predicted: true,
            source: SOURCE_PREDICTED.to_string(),
        }
    }

    /// Build an event from an authoritative feed tagged [`SOURCE_ADMIRALTY`].
    pub fn authoritative(kind: EventKind, timestamp: DateTime<Utc>, height: f64) -> Self {
        Self {
            kind,
            timestamp,
            height,
            is_predicted: false,
            source: SOURCE_ADMIRALTY.to_string(),
        }
    }

    /// Calendar date of the event (UTC).
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Minutes since UTC midnight, 0..=1439.
    pub fn minute_of_day(&self) -> u32 {
        self.timestamp.hour() * 60 + self.timestamp.minute()
    }

    pub fn is_high_water(&self) -> bool {
        self.kind == EventKind::HighWater
    }

    pub fn is_low_water(&self) -> bool {
        self.kind == EventKind::LowWater
    }
}

/// Characteristic heights of a tidal station, in metres.
///
/// Missing values fall back to generic defaults (4.5 / 3.5 / 1.5 / 0.5).
/// The expected ordering MHWS ≥ MHWN ≥ MLWN ≥ MLWS is not enforced.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConstants {
    #[serde(rename = "mhws")]
    pub mean_high_water_springs: f64,
    #[serde(rename = "mhwn")]
    pub mean_high_water_neaps: f64,
    #[serde(rename = "mlwn")]
    pub mean_low_water_neaps: f64,
    #[serde(rename = "mlws")]
    pub mean_low_water_springs: f64,
}

impl Default for StationConstants {
    fn default() -> Self {
        Self {
            mean_high_water_springs: 4.5,
            mean_high_water_neaps: 3.5,
            mean_low_water_neaps: 1.5,
            mean_low_water_springs: 0.5,
        }
    }
}

impl StationConstants {
    pub fn new(mhws: f64, mhwn: f64, mlwn: f64, mlws: f64) -> Self {
        Self {
            mean_high_water_springs: mhws,
            mean_high_water_neaps: mhwn,
            mean_low_water_neaps: mlwn,
            mean_low_water_springs: mlws,
        }
    }
}

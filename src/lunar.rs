//! Mean lunar phase and the spring/neap cycle.
//!
//! A low-precision model: the Moon's age is measured from a single known new
//! moon using the mean synodic month. Good to a few hours over a decade either
//! side of the reference, which is plenty for a tidal envelope.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Mean synodic month in days.
pub const LUNAR_CYCLE_DAYS: f64 = 29.53059;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Reference new moon: 2024-01-11 11:57 UTC.
pub fn known_new_moon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 11, 11, 57, 0)
        .single()
        .unwrap_or_default()
}

/// Epoch and period of the mean lunar cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LunarCycle {
    pub reference_new_moon: DateTime<Utc>,
    pub length_days: f64,
}

impl Default for LunarCycle {
    fn default() -> Self {
        Self {
            reference_new_moon: known_new_moon(),
            length_days: LUNAR_CYCLE_DAYS,
        }
    }
}

impl LunarCycle {
    /// Fraction of the cycle elapsed at `at`, in `[0, 1)`. 0 is new moon, 0.5 full.
    pub fn phase(&self, at: DateTime<Utc>) -> f64 {
        let days = (at - self.reference_new_moon).num_milliseconds() as f64 / MILLIS_PER_DAY;
        let phase = (days % self.length_days) / self.length_days;
        let phase = if phase < 0.0 { phase + 1.0 } else { phase };
        // -1e-17 + 1.0 rounds up to exactly 1.0
        if phase >= 1.0 {
            0.0
        } else {
            phase
        }
    }

    /// 1.0 at new and full moon (springs), 0.0 at the quarters (neaps).
    pub fn spring_neap_factor(&self, at: DateTime<Utc>) -> f64 {
        spring_neap_factor_for_phase(self.phase(at))
    }

    pub fn moon_phase(&self, at: DateTime<Utc>) -> MoonPhase {
        MoonPhase::from_phase(self.phase(at))
    }
}

/// Spring/neap factor for a phase already in `[0, 1)`.
pub fn spring_neap_factor_for_phase(phase: f64) -> f64 {
    let proximity = phase
        .abs()
        .min((phase - 0.5).abs())
        .min((phase - 1.0).abs());
    1.0 - proximity / 0.25
}

/// Lunar phase with the default reference epoch and cycle.
pub fn lunar_phase(at: DateTime<Utc>) -> f64 {
    LunarCycle::default().phase(at)
}

/// The eight conventional named phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoonPhase {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl MoonPhase {
    /// Bucket a phase fraction; each named phase spans 1/8 of the cycle
    /// centred on its nominal point.
    pub fn from_phase(phase: f64) -> Self {
        match phase {
            p if !(0.0625..0.9375).contains(&p) => MoonPhase::NewMoon,
            p if p < 0.1875 => MoonPhase::WaxingCrescent,
            p if p < 0.3125 => MoonPhase::FirstQuarter,
            p if p < 0.4375 => MoonPhase::WaxingGibbous,
            p if p < 0.5625 => MoonPhase::FullMoon,
            p if p < 0.6875 => MoonPhase::WaningGibbous,
            p if p < 0.8125 => MoonPhase::LastQuarter,
            _ => MoonPhase::WaningCrescent,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MoonPhase::NewMoon => "New Moon",
            MoonPhase::WaxingCrescent => "Waxing Crescent",
            MoonPhase::FirstQuarter => "First Quarter",
            MoonPhase::WaxingGibbous => "Waxing Gibbous",
            MoonPhase::FullMoon => "Full Moon",
            MoonPhase::WaningGibbous => "Waning Gibbous",
            MoonPhase::LastQuarter => "Last Quarter",
            MoonPhase::WaningCrescent => "Waning Crescent",
        }
    }

    /// New and full moon bring spring tides.
    pub fn is_spring(&self) -> bool {
        matches!(self, MoonPhase::NewMoon | MoonPhase::FullMoon)
    }
}

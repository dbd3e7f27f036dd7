//! Built-in demo stations.
//!
//! Used when no Admiralty API key is configured, and as the source of tidal
//! constants for prediction: the `TidalEvents` endpoint does not return them.

use crate::{Result, StationConstants, TideError};
use serde::{Deserialize, Serialize};

/// A tidal station with the constants the predictor needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Admiralty station id, e.g. "0240"
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub country: String,
    /// Only used for weather lookups by callers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(flatten)]
    pub constants: StationConstants,
}

#[allow(clippy::too_many_arguments)]
fn station(
    id: &str,
    name: &str,
    country: &str,
    lat: f64,
    lon: f64,
    mhws: f64,
    mhwn: f64,
    mlwn: f64,
    mlws: f64,
) -> Station {
    Station {
        id: id.to_string(),
        name: name.to_string(),
        country: country.to_string(),
        lat: Some(lat),
        lon: Some(lon),
        constants: StationConstants::new(mhws, mhwn, mlwn, mlws),
    }
}

/// The ten demo stations around the UK.
pub fn demo_stations() -> Vec<Station> {
    vec![
        station("0001", "Aberdeen", "Scotland", 57.143, -2.079, 4.3, 3.4, 1.3, 0.5),
        station("0113", "London Bridge", "England", 51.507, -0.087, 7.1, 6.0, 1.5, 0.5),
        station("0162", "Liverpool (Alfred Dock)", "England", 53.405, -2.994, 9.4, 7.5, 2.9, 1.0),
        station("0240", "Southampton", "England", 50.899, -1.391, 4.5, 3.7, 1.8, 0.5),
        station("0316", "Dover", "England", 51.114, 1.318, 6.8, 5.3, 1.9, 0.8),
        station("0402", "Bristol (Avonmouth)", "England", 51.509, -2.711, 13.2, 9.8, 3.8, 0.9),
        station("0452", "Plymouth (Devonport)", "England", 50.368, -4.186, 5.5, 4.4, 2.2, 0.8),
        station("0503", "Cardiff", "Wales", 51.461, -3.165, 12.4, 9.2, 3.6, 0.8),
        station("0590", "Holyhead", "Wales", 53.314, -4.633, 5.6, 4.4, 2.0, 0.7),
        station("0621", "Belfast", "Northern Ireland", 54.607, -5.909, 3.5, 3.0, 1.1, 0.4),
    ]
}

/// Look a station up by exact id, or by case-insensitive name fragment.
pub fn find_station(query: &str) -> Result<Station> {
    let query = query.trim();
    let needle = query.to_lowercase();
    let stations = demo_stations();

    stations
        .iter()
        .find(|s| s.id == query)
        .or_else(|| {
            stations
                .iter()
                .find(|s| s.name.to_lowercase().contains(&needle))
        })
        .cloned()
        .ok_or_else(|| TideError::UnknownStation(query.to_string()))
}

//! # Configuration Management
//!
//! Loads `scrub-tide.toml`: the station to plan for, Admiralty API access,
//! prediction model constants and the preferred beaching window. Every
//! section is optional; anything missing takes its default.

use crate::predictor::PredictionConstants;
use crate::scrubbing::{parse_hhmm, ScrubWindowPreference};
use crate::stations::{demo_stations, Station};
use crate::tide_data::{AccessTier, DEFAULT_BASE_URL};
use crate::{Result, StationConstants, TideError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "scrub-tide.toml";

/// Environment variable that overrides `api.subscription_key`.
pub const API_KEY_ENV: &str = "ADMIRALTY_API_KEY";

/// Application configuration loaded from scrub-tide.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub station: Station,
    pub api: ApiConfig,
    pub prediction: PredictionConfig,
    pub scrubbing: ScrubbingConfig,
}

/// Admiralty Tidal API access
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Without a key only predictions are used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_key: Option<String>,
    pub tier: AccessTier,
    pub timeout_secs: u64,
    pub cache_dir: PathBuf,
    pub cache_ttl_minutes: u64,
}

/// Prediction model settings
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PredictionConfig {
    /// Fixed jitter seed; entropy-seeded when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(flatten)]
    pub model: PredictionConstants,
}

/// Preferred clock window for the beaching high water, `HH:MM` UTC
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScrubbingConfig {
    pub high_water_start: String,
    pub high_water_end: String,
}

impl Default for Config {
    fn default() -> Self {
        let station = demo_stations()
            .into_iter()
            .find(|s| s.id == "0240")
            .unwrap_or_else(|| Station {
                id: "0240".to_string(),
                name: "Southampton".to_string(),
                country: "England".to_string(),
                lat: None,
                lon: None,
                constants: StationConstants::default(),
            });
        Config {
            station,
            api: ApiConfig::default(),
            prediction: PredictionConfig::default(),
            scrubbing: ScrubbingConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            subscription_key: None,
            tier: AccessTier::Free,
            timeout_secs: 30,
            cache_dir: std::env::temp_dir().join("scrub-tide"),
            cache_ttl_minutes: 30,
        }
    }
}

impl Default for ScrubbingConfig {
    fn default() -> Self {
        ScrubbingConfig {
            high_water_start: "06:30".to_string(),
            high_water_end: "09:00".to_string(),
        }
    }
}

impl ApiConfig {
    /// Subscription key from the environment, else from the file. Blank keys
    /// count as absent.
    pub fn resolved_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .or_else(|| self.subscription_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes * 60)
    }
}

impl ScrubbingConfig {
    pub fn preference(&self) -> Result<ScrubWindowPreference> {
        Ok(ScrubWindowPreference::new(
            parse_hhmm(&self.high_water_start)?,
            parse_hhmm(&self.high_water_end)?,
        ))
    }
}

impl Config {
    /// Load configuration from scrub-tide.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(config) => {
                info!(station = %config.station.name, path = %path.display(), "loaded configuration");
                config
            }
            Err(err) if is_missing_file(&err) => {
                info!(path = %path.display(), "no config file found, using defaults (Southampton)");
                Self::default()
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "invalid or unreadable config file, using defaults (Southampton)");
                Self::default()
            }
        }
    }

    /// Load and validate, surfacing every error.
    pub fn try_load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&contents).map_err(|e| TideError::Config(e.to_string()))?;
        config.scrubbing.preference()?;
        Ok(config)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| TideError::Config(e.to_string()))?;
        fs::write(path.as_ref(), contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }
}

fn is_missing_file(err: &TideError) -> bool {
    matches!(err, TideError::Io(e) if e.kind() == io::ErrorKind::NotFound)
}

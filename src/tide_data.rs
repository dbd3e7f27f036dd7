//! # Admiralty Tidal Event Fetching and Caching
//!
//! Fetches authoritative high/low water times from the UK Hydrographic
//! Office's Admiralty Tidal API and merges them with predicted events.
//!
//! ## Data Source
//! - **URL**: `{base}/Stations/{id}/TidalEvents?duration={days}`
//! - **Auth**: `Ocp-Apim-Subscription-Key` header
//! - **Format**: JSON array of `{EventType, DateTime, Height, ...}`, times in UTC
//!   without an offset
//! - **Window**: 7 days on the free tier, up to 30 with a subscription
//!
//! ## Caching Strategy
//! Responses are normalized and stored as JSON, one file per station and
//! duration, under the configured cache directory. The file modification time
//! is compared against the TTL before loading. A stale or corrupt cache falls
//! through to the network; failing to write the cache is logged and ignored.
//!
//! ## Merging
//! The API only covers the next few days while the calendar needs a whole
//! month, so callers merge with predictions by calendar date: any date the
//! API covers uses only API events ([`merge_events`]).

use crate::{EventKind, Result, TideError, TideEvent};
use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use std::{fs, io};
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://admiraltyapi.azure-api.net/uktidalapi/api/V1";

const SUBSCRIPTION_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// What the user's account is allowed to fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    #[default]
    Free,
    Subscriber,
}

impl AccessTier {
    /// Days of authoritative events to request.
    pub fn api_duration_days(&self) -> u32 {
        match self {
            AccessTier::Free => 7,
            AccessTier::Subscriber => 30,
        }
    }

    /// Days to predict from the first of a month with `days_in_month` days.
    pub fn prediction_days(&self, days_in_month: u32) -> u32 {
        match self {
            AccessTier::Free => 14,
            AccessTier::Subscriber => days_in_month + 7,
        }
    }
}

/// One event as returned by the `TidalEvents` endpoint.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdmiraltyEvent {
    pub event_type: String,
    pub date_time: String,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub is_approximate_time: Option<bool>,
    #[serde(default)]
    pub is_approximate_height: Option<bool>,
}

impl AdmiraltyEvent {
    /// Convert to a [`TideEvent`]; `None` for unknown types, unparseable times
    /// or missing heights.
    pub fn to_tide_event(&self) -> Option<TideEvent> {
        let kind = match self.event_type.as_str() {
            "HighWater" => EventKind::HighWater,
            "LowWater" => EventKind::LowWater,
            _ => return None,
        };
        let timestamp = parse_admiralty_time(&self.date_time)?;
        let height = self.height?;
        Some(TideEvent::authoritative(kind, timestamp, height))
    }
}

/// Parse `2025-03-01T04:12:00`, with optional fractional seconds or `Z`.
pub fn parse_admiralty_time(text: &str) -> Option<chrono::DateTime<Utc>> {
    let naive = text.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// Normalize a raw response, dropping entries that cannot be used.
pub fn normalize_events(raw: &[AdmiraltyEvent]) -> Vec<TideEvent> {
    let mut events: Vec<TideEvent> = raw
        .iter()
        .filter_map(|e| {
            let event = e.to_tide_event();
            if event.is_none() {
                warn!(
                    event_type = %e.event_type,
                    date_time = %e.date_time,
                    "dropping unusable Admiralty event"
                );
            }
            event
        })
        .collect();
    events.sort_by_key(|e| e.timestamp);
    events
}

/// Keep every authoritative event, and predicted events only for dates the
/// authoritative set does not cover. Result is sorted by time.
pub fn merge_events(authoritative: Vec<TideEvent>, predicted: Vec<TideEvent>) -> Vec<TideEvent> {
    let covered: HashSet<NaiveDate> = authoritative.iter().map(TideEvent::date).collect();

    let mut merged = authoritative;
    merged.extend(
        predicted
            .into_iter()
            .filter(|event| !covered.contains(&event.date())),
    );
    merged.sort_by_key(|event| event.timestamp);
    merged
}

/// Thin async client for the Admiralty Tidal API.
#[derive(Clone, Debug)]
pub struct AdmiraltyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AdmiraltyClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn events_url(&self, station_id: &str) -> String {
        format!(
            "{}/Stations/{}/TidalEvents",
            self.base_url.trim_end_matches('/'),
            station_id
        )
    }

    /// Fetch and normalize tidal events for the next `duration_days` days.
    pub async fn tidal_events(&self, station_id: &str, duration_days: u32) -> Result<Vec<TideEvent>> {
        let response = self
            .http
            .get(self.events_url(station_id))
            .query(&[("duration", duration_days)])
            .header(SUBSCRIPTION_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TideError::Status(status.as_u16()));
        }

        let raw: Vec<AdmiraltyEvent> = response.json().await?;
        debug!(station_id, count = raw.len(), "fetched Admiralty events");
        Ok(normalize_events(&raw))
    }
}

/// On-disk JSON cache of normalized events.
#[derive(Clone, Debug)]
pub struct TideCache {
    dir: PathBuf,
    ttl: Duration,
}

impl TideCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn path_for(&self, station_id: &str, duration_days: u32) -> PathBuf {
        self.dir
            .join(format!("tide_events_{station_id}_{duration_days}d.json"))
    }

    /// Load cached events if the file exists and is younger than the TTL.
    pub fn load(&self, station_id: &str, duration_days: u32) -> io::Result<Vec<TideEvent>> {
        let path = self.path_for(station_id, duration_days);
        let meta = fs::metadata(&path)?;

        let age = SystemTime::now()
            .duration_since(meta.modified()?)
            .map_err(|_| io::Error::other("time error"))?;

        if age > self.ttl {
            return Err(io::Error::other("stale"));
        }

        let data = fs::read(&path)?;
        let events = serde_json::from_slice(&data)?;
        Ok(events)
    }

    pub fn save(&self, station_id: &str, duration_days: u32, events: &[TideEvent]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_vec(events)?;
        write_atomic(&self.path_for(station_id, duration_days), &data)
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    fs::rename(tmp, path)
}

/// Fetch authoritative events for a station, cache first.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use scrub_tide_lib::tide_data::{fetch, AdmiraltyClient, TideCache, DEFAULT_BASE_URL};
///
/// # async fn run() -> scrub_tide_lib::Result<()> {
/// let client = AdmiraltyClient::new(DEFAULT_BASE_URL, "key", Duration::from_secs(30))?;
/// let cache = TideCache::new("/tmp/scrub-tide", Duration::from_secs(1800));
/// let events = fetch(&client, &cache, "0240", 7).await?;
/// # Ok(())
/// # }
/// ```
pub async fn fetch(
    client: &AdmiraltyClient,
    cache: &TideCache,
    station_id: &str,
    duration_days: u32,
) -> Result<Vec<TideEvent>> {
    match cache.load(station_id, duration_days) {
        Ok(events) => {
            debug!(station_id, count = events.len(), "using cached tidal events");
            return Ok(events);
        }
        Err(err) => debug!(station_id, %err, "tidal event cache miss"),
    }

    let events = client.tidal_events(station_id, duration_days).await?;

    if let Err(err) = cache.save(station_id, duration_days, &events) {
        warn!(station_id, %err, "could not write tidal event cache");
    }

    Ok(events)
}

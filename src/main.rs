//! # Scrub Tide Entry Point
//!
//! Plans hull-scrubbing days for a month at one station: fetches Admiralty
//! tidal events when an API key is available, fills the rest of the month
//! with harmonic predictions, rates every day and prints the results.


use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub use scrub_tide_lib::{config::Config, StationConstants, TideEvent};
use scrub_tide_lib::{
    predictor::{self, Predictor, UniformJitter},
    renderer, scrubbing,
    stations::{self, Station},
    tide_data::{self, AccessTier, AdmiraltyClient, TideCache},
};

#[derive(Parser, Debug)]
#[command(name = "scrub-tide", version, about = "Find good days to dry out and scrub a hull")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = scrub_tide_lib::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Station id or name fragment from the built-in list (overrides config)
    #[arg(short, long)]
    station: Option<String>,

    /// Month to plan, YYYY-MM (defaults to the current month)
    #[arg(short, long, value_parser = parse_month)]
    month: Option<NaiveDate>,

    /// Days to predict from the first of the month (at most 366)
    #[arg(short, long, allow_negative_numbers = true)]
    days: Option<i64>,

    /// Earliest acceptable beaching high water, HH:MM UTC
    #[arg(long)]
    hw_start: Option<String>,

    /// Latest acceptable beaching high water, HH:MM UTC
    #[arg(long)]
    hw_end: Option<String>,

    /// Use the subscriber API window and prediction range
    #[arg(long)]
    subscriber: bool,

    /// Skip the Admiralty API and use predictions only
    #[arg(long)]
    offline: bool,

    /// Seed for the prediction height jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Also list every high and low water
    #[arg(long)]
    events: bool,

    /// Print the built-in stations and exit
    #[arg(long)]
    list_stations: bool,
}

/// Parse `YYYY-MM` into the first day of that month.
fn parse_month(text: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{}-01", text.trim()), "%Y-%m-%d")
        .map_err(|_| format!("invalid month '{text}', expected YYYY-MM"))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Authoritative events, or an empty list when unavailable.
fn fetch_authoritative(config: &Config, station: &Station, tier: AccessTier) -> Vec<TideEvent> {
    let Some(key) = config.api.resolved_key() else {
        info!("no Admiralty API key configured, using predictions only");
        return Vec::new();
    };

    let result = (|| -> anyhow::Result<Vec<TideEvent>> {
        let client = AdmiraltyClient::new(&config.api.base_url, key, config.api.timeout())?;
        let cache = TideCache::new(&config.api.cache_dir, config.api.cache_ttl());
        let rt = tokio::runtime::Runtime::new()?;
        let events = rt.block_on(tide_data::fetch(
            &client,
            &cache,
            &station.id,
            tier.api_duration_days(),
        ))?;
        Ok(events)
    })();

    result.unwrap_or_else(|err| {
        warn!(%err, "tidal event fetch failed, falling back to predictions");
        Vec::new()
    })
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    if cli.list_stations {
        for s in stations::demo_stations() {
            println!(
                "{}  {:<26} {:<17} MHWS {:>4.1}  MHWN {:>4.1}  MLWN {:>4.1}  MLWS {:>4.1}",
                s.id,
                s.name,
                s.country,
                s.constants.mean_high_water_springs,
                s.constants.mean_high_water_neaps,
                s.constants.mean_low_water_neaps,
                s.constants.mean_low_water_springs
            );
        }
        return Ok(());
    }

    let mut config = Config::load_from_path(&cli.config);

    let station = match &cli.station {
        Some(query) => stations::find_station(query)?,
        None => config.station.clone(),
    };
    if let Some(start) = cli.hw_start {
        config.scrubbing.high_water_start = start;
    }
    if let Some(end) = cli.hw_end {
        config.scrubbing.high_water_end = end;
    }
    let preference = config
        .scrubbing
        .preference()
        .context("invalid high water window")?;

    let tier = if cli.subscriber {
        AccessTier::Subscriber
    } else {
        config.api.tier
    };

    let month = cli.month.unwrap_or_else(|| Utc::now().date_naive());
    let (first, days_in_month) = predictor::month_window(month);
    let days = match cli.days {
        Some(days) => predictor::checked_days(days)?,
        None => tier.prediction_days(days_in_month),
    };

    info!(
        station = %station.name,
        month = %first.format("%Y-%m"),
        days,
        "planning scrubbing days"
    );

    let model = Predictor::new(config.prediction.model);
    let start = predictor::utc_midnight(first);
    let predicted = match cli.seed.or(config.prediction.seed) {
        Some(seed) => model.predict(
            &station.constants,
            start,
            days,
            &mut UniformJitter::seeded(seed),
        ),
        None => model.predict(&station.constants, start, days, &mut UniformJitter::thread()),
    };

    let authoritative = if cli.offline {
        Vec::new()
    } else {
        fetch_authoritative(&config, &station, tier)
    };
    let events = tide_data::merge_events(authoritative, predicted);
    let assessments = scrubbing::assess_scrubbing_days(&events, &preference);

    println!("{} ({})", station.name, station.id);
    println!();
    renderer::draw_calendar(first, days_in_month, &events, &assessments);
    println!();
    if cli.events {
        renderer::draw_events(&events, &model.constants().lunar);
        println!();
    }
    renderer::draw_ranked(&assessments);

    Ok(())
}

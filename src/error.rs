//! Error type shared by the feed client, configuration and input parsing.
//!
//! The predictor and analyzer never fail on well-typed input; everything
//! here comes from the edges of the system (network, disk, user input).

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TideError {
    /// HTTP request failed (network, server, or protocol error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Admiralty API answered with a non-success status
    #[error("Admiralty API returned status {0}")]
    Status(u16),

    /// Config or cache file operations failed (missing, permissions, disk space)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// A clock time that is not `HH:MM` within a single day
    #[error("invalid time of day '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("day count must not be negative, got {0}")]
    InvalidDays(i64),

    #[error("unknown station '{0}'")]
    UnknownStation(String),
}

pub type Result<T> = std::result::Result<T, TideError>;

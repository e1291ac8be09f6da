use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while resolving the startup configuration. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber {
        key: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("{key} must be `continue` or `abort`, got {value:?}")]
    InvalidPolicy { key: &'static str, value: String },

    #[error("minimum score {min} is greater than maximum score {max}")]
    InvalidScoreBounds { min: u32, max: u32 },
}

/// Failures talking to the Tatsu scoring API.
#[derive(Debug, Error)]
pub enum ScoringApiError {
    #[error("scoring API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("scoring API returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Top-level error surfaced to the supervisor.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("gateway connection failed: {0}")]
    GatewayConnect(#[source] serenity::Error),

    #[error("failed to submit score for user {user_id}: {source}")]
    ScoringApi {
        user_id: u64,
        #[source]
        source: ScoringApiError,
    },
}

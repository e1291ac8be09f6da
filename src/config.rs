use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::score::ScoreBounds;

pub const DISCORD_TOKEN_KEY: &str = "DISCORD_BOT_TOKEN";
pub const TATSU_TOKEN_KEY: &str = "TATSU_API_TOKEN";
pub const MAX_SCORE_KEY: &str = "TATSU_MAX_SCORE";
pub const MIN_SCORE_KEY: &str = "TATSU_MIN_SCORE";
pub const GUILD_ID_KEY: &str = "DISCORD_GID";
pub const LOG_CHANNEL_KEY: &str = "DISCORD_LOG_CHANNEL";
pub const ERROR_POLICY_KEY: &str = "SCORE_ERROR_POLICY";

/// What to do when a score submission fails at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log the failure and keep processing events.
    #[default]
    Continue,
    /// Shut the bot down.
    Abort,
}

impl FromStr for ErrorPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            _ => Err(ConfigError::InvalidPolicy {
                key: ERROR_POLICY_KEY,
                value: value.to_owned(),
            }),
        }
    }
}

/// Runtime settings, loaded once at startup and read-only afterwards.
#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "DISCORD_BOT_TOKEN", default)]
    pub discord_token: String,
    #[serde(rename = "TATSU_API_TOKEN", default)]
    pub tatsu_token: String,
    #[serde(rename = "TATSU_MAX_SCORE")]
    pub max_score: u32,
    #[serde(rename = "TATSU_MIN_SCORE")]
    pub min_score: u32,
    #[serde(rename = "DISCORD_GID", default)]
    pub guild_id: String,
    #[serde(rename = "DISCORD_LOG_CHANNEL", default)]
    pub log_channel_id: String,
    #[serde(rename = "SCORE_ERROR_POLICY", default)]
    pub score_error_policy: ErrorPolicy,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"<redacted>")
            .field("tatsu_token", &"<redacted>")
            .field("max_score", &self.max_score)
            .field("min_score", &self.min_score)
            .field("guild_id", &self.guild_id)
            .field("log_channel_id", &self.log_channel_id)
            .field("score_error_policy", &self.score_error_policy)
            .finish()
    }
}

impl Config {
    /// Load from `path` when given, otherwise from the process environment.
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::from_env_with(|key| std::env::var(key).ok())?,
        };
        config.score_bounds()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Missing string variables resolve to an empty string; the score
    /// variables must be present and numeric.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str| lookup(key).unwrap_or_default();

        Ok(Self {
            discord_token: string(DISCORD_TOKEN_KEY),
            tatsu_token: string(TATSU_TOKEN_KEY),
            max_score: parse_score(MAX_SCORE_KEY, &string(MAX_SCORE_KEY))?,
            min_score: parse_score(MIN_SCORE_KEY, &string(MIN_SCORE_KEY))?,
            guild_id: string(GUILD_ID_KEY),
            log_channel_id: string(LOG_CHANNEL_KEY),
            score_error_policy: string(ERROR_POLICY_KEY).parse()?,
        })
    }

    pub fn score_bounds(&self) -> Result<ScoreBounds, ConfigError> {
        ScoreBounds::new(self.min_score, self.max_score)
    }
}

fn parse_score(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|source| ConfigError::InvalidNumber {
            key,
            value: value.to_owned(),
            source,
        })
}

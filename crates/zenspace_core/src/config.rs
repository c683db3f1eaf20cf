//! Environment-driven runtime configuration.
//!
//! # Responsibility
//! - Resolve storage, logging and AI settings from environment variables.
//! - Reject malformed values early with a readable error.
//!
//! # Invariants
//! - Blank variables are treated as unset.
//! - The API key is never included in `Debug` output.

use crate::ai::gemini::DEFAULT_ENDPOINT;
use crate::logging::default_log_level;
use crate::repo::entry_slot::DEFAULT_SLOT_KEY;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_DB_FILE_NAME: &str = "zenspace.sqlite3";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_DB_PATH: &str = "ZENSPACE_DB_PATH";
pub const ENV_SLOT_KEY: &str = "ZENSPACE_SLOT_KEY";
pub const ENV_LOG_LEVEL: &str = "ZENSPACE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "ZENSPACE_LOG_DIR";
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "API_KEY";
pub const ENV_AI_MODEL: &str = "ZENSPACE_AI_MODEL";
pub const ENV_AI_ENDPOINT: &str = "ZENSPACE_AI_ENDPOINT";
pub const ENV_AI_TIMEOUT_SECS: &str = "ZENSPACE_AI_TIMEOUT_SECS";

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        variable: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                variable,
                value,
                expected,
            } => write!(f, "invalid value `{value}` for {variable}; expected {expected}"),
        }
    }
}

impl Error for ConfigError {}

/// AI provider settings.
#[derive(Clone, PartialEq, Eq)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Debug for AiConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub slot_key: String,
    pub log_level: String,
    /// Logging stays disabled when unset.
    pub log_dir: Option<PathBuf>,
    pub ai: AiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            slot_key: DEFAULT_SLOT_KEY.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
            ai: AiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its raw value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let timeout = match read(ENV_AI_TIMEOUT_SECS) {
            Some(raw) => parse_timeout(&raw)?,
            None => defaults.ai.timeout,
        };

        Ok(Self {
            db_path: read(ENV_DB_PATH).map_or(defaults.db_path, PathBuf::from),
            slot_key: read(ENV_SLOT_KEY).unwrap_or(defaults.slot_key),
            log_level: read(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
            ai: AiConfig {
                api_key: read(ENV_API_KEY).or_else(|| read(ENV_API_KEY_FALLBACK)),
                model: read(ENV_AI_MODEL).unwrap_or(defaults.ai.model),
                endpoint: read(ENV_AI_ENDPOINT).unwrap_or(defaults.ai.endpoint),
                timeout,
            },
        })
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            variable: ENV_AI_TIMEOUT_SECS,
            value: raw.to_string(),
            expected: "a positive number of seconds",
        }),
    }
}

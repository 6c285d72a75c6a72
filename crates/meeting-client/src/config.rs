//! Meeting client configuration.
//!
//! Configuration is loaded from environment variables.

use common::config::{ObservabilityConfig, DEFAULT_LOG_FILTER};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default media region requested for new meetings.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default HTTP timeout for the join request, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 10;

/// Default capacity of the runtime event queue.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Meeting client configuration.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the meeting service (join endpoint lives at `{api_url}/join`).
    pub api_url: String,

    /// Media region requested for new meetings (default: "us-east-1").
    pub region: String,

    /// Total timeout for the join request.
    pub http_timeout: Duration,

    /// Capacity of the queue between the runtime bridge and the event pump.
    pub event_buffer: usize,

    /// Logging setup.
    pub observability: ObservabilityConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("region", &self.region)
            .field("http_timeout", &self.http_timeout)
            .field("event_buffer", &self.event_buffer)
            .field("json_logs", &self.observability.json_logs)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// does not parse.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let api_url = vars
            .get("MC_CLIENT_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("MC_CLIENT_API_URL".to_string()))?;

        let region = vars
            .get("MC_CLIENT_REGION")
            .cloned()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let http_timeout_seconds = parse_positive(
            vars,
            "MC_CLIENT_HTTP_TIMEOUT_SECONDS",
            DEFAULT_HTTP_TIMEOUT_SECONDS,
        )?;

        let event_buffer = parse_positive(vars, "MC_CLIENT_EVENT_BUFFER", DEFAULT_EVENT_BUFFER)?;

        let json_logs = match vars.get("MC_CLIENT_JSON_LOGS").map(String::as_str) {
            None => false,
            Some(value) => value.parse::<bool>().map_err(|e| {
                ConfigError::InvalidValue(format!(
                    "MC_CLIENT_JSON_LOGS must be 'true' or 'false', got '{value}': {e}"
                ))
            })?,
        };

        Ok(Config {
            api_url,
            region,
            http_timeout: Duration::from_secs(http_timeout_seconds),
            event_buffer,
            observability: ObservabilityConfig {
                log_filter: DEFAULT_LOG_FILTER.to_string(),
                json_logs,
            },
        })
    }
}

/// Parse an optional positive integer, falling back to `default` when unset.
fn parse_positive<T>(vars: &HashMap<String, String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
    T::Err: fmt::Display,
{
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: T = value_str.parse().map_err(|e| {
        ConfigError::InvalidValue(format!(
            "{name} must be a valid positive integer, got '{value_str}': {e}"
        ))
    })?;

    if value == T::default() {
        return Err(ConfigError::InvalidValue(format!(
            "{name} must be greater than 0"
        )));
    }

    Ok(value)
}

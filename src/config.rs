//! Process configuration.
//!
//! Read once at startup from the environment, optionally overridden by CLI
//! flags, and handed explicitly to whatever needs it.
//!
//! - `SISYPHUS_HF_TOKEN` (or `HF_TOKEN`): bearer token for the inference API
//! - `SISYPHUS_ENDPOINT`: text-generation endpoint URL
//! - `SISYPHUS_TIMEOUT_SECS`: optional request timeout in seconds

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/HuggingFaceH4/zephyr-7b-beta";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Runtime configuration.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Bearer token; requests go out unauthenticated when absent.
    pub api_token: Option<String>,
    pub endpoint: String,
    /// `None` leaves the request unbounded.
    pub request_timeout: Option<Duration>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = lookup("SISYPHUS_HF_TOKEN")
            .or_else(|| lookup("HF_TOKEN"))
            .filter(|t| !t.trim().is_empty());

        let endpoint = lookup("SISYPHUS_ENDPOINT")
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let request_timeout = match lookup("SISYPHUS_TIMEOUT_SECS") {
            Some(raw) => Some(parse_timeout("SISYPHUS_TIMEOUT_SECS", &raw)?),
            None => None,
        };

        Ok(Self {
            api_token,
            endpoint,
            request_timeout,
        })
    }

    /// Apply command-line overrides on top of the loaded values.
    pub fn with_overrides(mut self, endpoint: Option<String>, timeout_secs: Option<u64>) -> Self {
        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint;
        }
        if let Some(secs) = timeout_secs {
            self.request_timeout = Some(Duration::from_secs(secs));
        }
        self
    }
}

fn parse_timeout(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("{}", e)))?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue(key.to_string(), "must be at least 1".to_string()));
    }
    Ok(Duration::from_secs(secs))
}

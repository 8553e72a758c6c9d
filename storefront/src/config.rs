//! Configuration management for the storefront client.
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present) with sensible defaults.

use crate::error::ConfigError;
use std::time::Duration;

/// Default order backend URL
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
/// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "storefront=info";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Order backend configuration
    pub api: ApiConfig,
    /// How long facade calls wait for a result action
    pub action_timeout: Duration,
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
}

/// Order backend configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL, e.g. `http://localhost:3000/api`
    pub base_url: String,
    /// Optional bearer token
    pub token: Option<String>,
    /// HTTP request timeout
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            action_timeout: Duration::from_secs(15),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// # Environment Variables
    ///
    /// - `STOREFRONT_API_URL`: Order backend base URL (default: `http://localhost:3000/api`)
    /// - `STOREFRONT_API_TOKEN`: Bearer token (default: none)
    /// - `STOREFRONT_API_TIMEOUT_SECS`: HTTP request timeout (default: 10)
    /// - `STOREFRONT_ACTION_TIMEOUT_SECS`: Wait for result actions (default: 15)
    /// - `STOREFRONT_LOG`: Default log filter (default: `storefront=info`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a numeric variable or the URL is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a numeric variable or the URL is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = match lookup("STOREFRONT_API_URL") {
            Some(value) => validate_url("STOREFRONT_API_URL", value)?,
            None => defaults.api.base_url,
        };

        let token = lookup("STOREFRONT_API_TOKEN").filter(|t| !t.is_empty());

        let timeout = seconds(&lookup, "STOREFRONT_API_TIMEOUT_SECS")?
            .unwrap_or(defaults.api.timeout);

        let action_timeout = seconds(&lookup, "STOREFRONT_ACTION_TIMEOUT_SECS")?
            .unwrap_or(defaults.action_timeout);

        let log_filter = lookup("STOREFRONT_LOG").unwrap_or(defaults.log_filter);

        Ok(Self {
            api: ApiConfig {
                base_url,
                token,
                timeout,
            },
            action_timeout,
            log_filter,
        })
    }
}

fn seconds<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };

    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        _ => Err(ConfigError::InvalidNumber { var, value }),
    }
}

fn validate_url(var: &'static str, value: String) -> Result<String, ConfigError> {
    match reqwest::Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(value),
        Ok(url) => Err(ConfigError::InvalidUrl {
            var,
            reason: format!("unsupported scheme {}", url.scheme()),
            value,
        }),
        Err(e) => Err(ConfigError::InvalidUrl {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

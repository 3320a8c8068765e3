//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `VEBLYSS_API_URL` - Storefront base URL (default: <http://localhost:8000>)
//! - `VEBLYSS_API_TIMEOUT_SECS` - Per-request timeout (default: 10)

use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where the storefront lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: Url,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Config pointing at `api_url` with the default timeout.
    #[must_use]
    pub const fn new(api_url: Url) -> Self {
        Self {
            api_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load from the process environment (and `.env`, if present).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup("VEBLYSS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        let api_url = Url::parse(raw_url.trim())
            .map_err(|e| ConfigError::InvalidEnvVar("VEBLYSS_API_URL".to_owned(), e.to_string()))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "VEBLYSS_API_URL".to_owned(),
                format!("unsupported scheme '{}'", api_url.scheme()),
            ));
        }

        let timeout_secs = match lookup("VEBLYSS_API_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("VEBLYSS_API_TIMEOUT_SECS".to_owned(), e.to_string())
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "VEBLYSS_API_TIMEOUT_SECS".to_owned(),
                "must be at least 1".to_owned(),
            ));
        }

        Ok(Self {
            api_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("VEBLYSS_API_URL", "https://api.veblyss.test"),
            ("VEBLYSS_API_TIMEOUT_SECS", "3"),
        ])
        .unwrap();
        assert_eq!(config.api_url.host_str(), Some("api.veblyss.test"));
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(load(&[("VEBLYSS_API_URL", "ftp://example.com")]).is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        assert!(load(&[("VEBLYSS_API_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[("VEBLYSS_API_TIMEOUT_SECS", "ten")]).is_err());
    }
}

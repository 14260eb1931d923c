//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default onboarding service base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Default HTTP timeout for calls to the onboarding service.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Client configuration for the onboarding service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, without trailing slash (e.g. `http://localhost:8000/api`).
    pub api_url: String,
    /// Per-request transport timeout.
    pub timeout: Duration,
    /// Optional bearer token.
    pub api_token: Option<SecretString>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            api_token: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// - `NEWSDESK_API_URL`
    /// - `NEWSDESK_HTTP_TIMEOUT_SECS`
    /// - `NEWSDESK_API_TOKEN`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("NEWSDESK_API_URL").filter(|u| !u.trim().is_empty()) {
            config = config.with_api_url(url);
        }

        if let Some(raw) = lookup("NEWSDESK_HTTP_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "NEWSDESK_HTTP_TIMEOUT_SECS".into(),
                message: format!("expected a number of seconds, got {raw:?}"),
            })?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "NEWSDESK_HTTP_TIMEOUT_SECS".into(),
                    message: "timeout must be greater than zero".into(),
                });
            }
            config.timeout = Duration::from_secs(secs);
        }

        config.api_token = lookup("NEWSDESK_API_TOKEN")
            .filter(|t| !t.is_empty())
            .map(SecretString::from);

        Ok(config)
    }

    /// Override the base URL, trimming any trailing slash.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.api_url = url.trim().trim_end_matches('/').to_string();
        self
    }
}

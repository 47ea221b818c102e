//! Configuration for the sync manager and the HTTP transport.

use crate::error::{Error, Result};
use std::env;
use std::time::Duration;

/// Default debounce quiet period.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(1000);

/// Sync manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Time without local mutations before a send is attempted.
    pub quiet_period: Duration,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
        }
    }

    /// Sets the debounce quiet period.
    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    /// Load from `DOCSYNC_QUIET_PERIOD_MS`, falling back to the default.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();
        if let Ok(raw) = env::var("DOCSYNC_QUIET_PERIOD_MS") {
            let millis: u64 = raw.trim().parse().map_err(|_| Error::InvalidConfig {
                key: "DOCSYNC_QUIET_PERIOD_MS",
                value: raw.clone(),
            })?;
            config.quiet_period = Duration::from_millis(millis);
        }
        Ok(config)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Where and how to reach the collaboration endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Server base URL, e.g. `https://collab.example.com`
    pub base_url: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
}

impl HttpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Sets the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Load from `DOCSYNC_BASE_URL` (required) and `DOCSYNC_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let base_url =
            env::var("DOCSYNC_BASE_URL").map_err(|_| Error::MissingConfig("DOCSYNC_BASE_URL"))?;

        let mut config = Self::new(base_url);
        config.token = env::var("DOCSYNC_TOKEN").ok().filter(|t| !t.is_empty());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.quiet_period, Duration::from_millis(1000));

        let config = SyncConfig::new().with_quiet_period(Duration::from_millis(50));
        assert_eq!(config.quiet_period, Duration::from_millis(50));
    }

    #[test]
    fn http_config_trims_trailing_slash() {
        let config = HttpConfig::new("https://collab.example.com/").with_token("secret");
        assert_eq!(config.base_url, "https://collab.example.com");
        assert_eq!(config.token.as_deref(), Some("secret"));
    }
}

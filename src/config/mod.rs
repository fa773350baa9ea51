//! Configuration module for the bookwatch client.
//!
//! Provides the card store base URL, request timeout, poll period and retry
//! settings, either through a builder or from environment variables.

use std::time::Duration;

use crate::errors::{BookwatchError, BookwatchResult};

/// Default base URL of the card store service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

/// Default request timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default poll period (1 second).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default maximum retry attempts for idempotent requests.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Configuration for the bookwatch client.
#[derive(Debug, Clone)]
pub struct BookwatchConfig {
    /// Base URL for API requests, without a trailing slash.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Period between poll ticks.
    pub poll_interval: Duration,
    /// Maximum retry attempts for delete requests.
    pub max_retries: u32,
    /// Custom headers to include in requests.
    pub custom_headers: Vec<(String, String)>,
}

impl BookwatchConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BookwatchConfigBuilder {
        BookwatchConfigBuilder::new()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BOOKWATCH_BASE_URL` (optional): Card store base URL
    /// - `BOOKWATCH_TIMEOUT` (optional): Request timeout in seconds
    /// - `BOOKWATCH_POLL_INTERVAL_MS` (optional): Poll period in milliseconds
    /// - `BOOKWATCH_MAX_RETRIES` (optional): Maximum retry attempts
    pub fn from_env() -> BookwatchResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// Unparseable numeric values are ignored and fall back to defaults.
    pub(crate) fn from_lookup<F>(lookup: F) -> BookwatchResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = BookwatchConfigBuilder::new();

        if let Some(base_url) = lookup("BOOKWATCH_BASE_URL") {
            builder = builder.base_url(base_url);
        }

        if let Some(timeout_secs) = lookup("BOOKWATCH_TIMEOUT").and_then(|s| s.parse::<u64>().ok())
        {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }

        if let Some(interval_ms) =
            lookup("BOOKWATCH_POLL_INTERVAL_MS").and_then(|s| s.parse::<u64>().ok())
        {
            builder = builder.poll_interval(Duration::from_millis(interval_ms));
        }

        if let Some(retries) = lookup("BOOKWATCH_MAX_RETRIES").and_then(|s| s.parse::<u32>().ok()) {
            builder = builder.max_retries(retries);
        }

        builder.build()
    }
}

impl Default for BookwatchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            custom_headers: Vec::new(),
        }
    }
}

/// Builder for `BookwatchConfig`.
#[derive(Debug, Default)]
pub struct BookwatchConfigBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    poll_interval: Option<Duration>,
    max_retries: Option<u32>,
    custom_headers: Vec<(String, String)>,
}

impl BookwatchConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the poll period.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Sets the maximum retry attempts.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Adds a custom header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> BookwatchResult<BookwatchConfig> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let parsed = url::Url::parse(&base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BookwatchError::Configuration {
                message: format!("Unsupported URL scheme: {}", parsed.scheme()),
            });
        }

        let poll_interval = self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL);
        if poll_interval.is_zero() {
            return Err(BookwatchError::Configuration {
                message: "Poll interval must be greater than zero".to_string(),
            });
        }

        Ok(BookwatchConfig {
            base_url,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            poll_interval,
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            custom_headers: self.custom_headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_builder_success() {
        let config = BookwatchConfig::builder()
            .base_url("https://cards.example.com/")
            .timeout(Duration::from_secs(5))
            .poll_interval(Duration::from_millis(250))
            .max_retries(4)
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://cards.example.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.max_retries, 4);
    }

    #[test]
    fn test_config_builder_defaults() {
        let config = BookwatchConfig::builder().build().unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_config_rejects_bad_url() {
        assert!(BookwatchConfig::builder().base_url("not a url").build().is_err());
        assert!(BookwatchConfig::builder()
            .base_url("ftp://cards.example.com")
            .build()
            .is_err());
    }

    #[test]
    fn test_config_rejects_zero_poll_interval() {
        let result = BookwatchConfig::builder()
            .poll_interval(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(BookwatchError::Configuration { .. })));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("BOOKWATCH_BASE_URL", "http://127.0.0.1:9000"),
            ("BOOKWATCH_POLL_INTERVAL_MS", "500"),
            ("BOOKWATCH_MAX_RETRIES", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config =
            BookwatchConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }
}

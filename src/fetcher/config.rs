//! # Fetcher Configuration Module
//!
//! Configuration for the single-page fetcher: the browser identity sent with
//! every request, the timeout budget and the redirect limit. Built with the
//! same builder pattern as the rest of the crate's configuration types.

use std::time::Duration;

use tracing::warn;

/// Desktop browser identity sent by default
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Default `Accept-Language` header value
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "tr-TR,tr;q=0.9,en-US;q=0.8,en;q=0.7";

/// Default `Accept` header value
pub const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";

/// Configuration for the fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// User agent to use for requests
    pub user_agent: String,

    /// Value of the `Accept-Language` header
    pub accept_language: String,

    /// Value of the `Accept` header
    pub accept: String,

    /// Maximum number of redirects to follow
    pub max_redirects: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            max_redirects: 10,
        }
    }
}

/// Builder for FetcherConfig
#[derive(Debug, Default)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: FetcherConfig::default(),
        }
    }

    /// Set the request timeout in seconds. Zero is raised to one second.
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        if timeout_secs == 0 {
            warn!("Timeout of 0 seconds is not allowed, using 1 second");
        }
        self.config.timeout_secs = timeout_secs.max(1);
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the `Accept-Language` header value
    pub fn accept_language(mut self, accept_language: impl Into<String>) -> Self {
        self.config.accept_language = accept_language.into();
        self
    }

    /// Set the maximum number of redirects to follow
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.max_redirects = max_redirects;
        self
    }

    /// Build the configuration
    pub fn build(self) -> FetcherConfig {
        self.config
    }
}

impl FetcherConfig {
    /// Create a new builder
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::new()
    }

    /// Get the timeout as a Duration, never shorter than one second
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_look_like_a_browser() {
        let config = FetcherConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
        assert_eq!(config.max_redirects, 10);
    }

    #[test]
    fn test_builder_overrides() {
        let config = FetcherConfig::builder()
            .timeout_secs(3)
            .user_agent("pagegrep-test")
            .max_redirects(0)
            .build();
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.user_agent, "pagegrep-test");
        assert_eq!(config.max_redirects, 0);
        assert_eq!(config.accept_language, DEFAULT_ACCEPT_LANGUAGE);
    }

    #[test]
    fn test_zero_timeout_is_raised_to_one_second() {
        let config = FetcherConfig::builder().timeout_secs(0).build();
        assert_eq!(config.timeout_secs, 1);
        assert_eq!(config.timeout(), Duration::from_secs(1));

        let config = FetcherConfig {
            timeout_secs: 0,
            ..FetcherConfig::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }
}

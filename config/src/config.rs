//! # Configuration Structures
//!
//! Configuration for the Gradebook rubric client.
//!
//! All configuration structures:
//! - Use `serde` for serialization/deserialization
//! - Use `validator` for input validation
//! - Fall back to sensible defaults for every field

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Top-level configuration.
///
/// ## Fields
/// - `api`: REST backend location, timeouts, retries and paging
/// - `cache`: query cache behavior
/// - `observability`: logging level
///
/// ## Usage
/// ```rust,no_run
/// use config::Config;
///
/// let config = Config::default();
/// println!("Backend: {}", config.api.base_url);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct Config {
    /// REST backend configuration
    #[serde(default)]
    #[validate(nested)]
    pub api: ApiConfig,

    /// Query cache configuration
    #[serde(default)]
    #[validate(nested)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    #[validate(nested)]
    pub observability: ObservabilityConfig
}

/// REST backend configuration.
///
/// ## Fields
/// - `base_url`: Backend root, without the `/api/v1` prefix
///   (default: "http://localhost:8080")
/// - `timeout_secs`: Per-request timeout (default: 30)
/// - `max_retries`: Attempts for transient failures of list reads (default: 3)
/// - `page_size`: `size` parameter for list requests (default: 100)
/// - `max_pages`: Upper bound on pages followed per collection (default: 50)
/// - `auth_token`: Bearer token, if the backend requires one
/// - `circuit_breaker_threshold`: Consecutive failures before the breaker
///   opens (default: 5)
/// - `circuit_breaker_reset_secs`: Seconds before a half-open trial request
///   (default: 30)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    #[validate(length(min = 1, max = 2048))]
    pub base_url: String,

    #[serde(default = "default_api_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub timeout_secs: u64,

    #[serde(default = "default_api_max_retries")]
    #[validate(range(min = 1, max = 10))]
    pub max_retries: u32,

    #[serde(default = "default_api_page_size")]
    #[validate(range(min = 1, max = 1000))]
    pub page_size: u32,

    #[serde(default = "default_api_max_pages")]
    #[validate(range(min = 1, max = 10000))]
    pub max_pages: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    #[serde(default = "default_api_circuit_breaker_threshold")]
    #[validate(range(min = 1, max = 100))]
    pub circuit_breaker_threshold: u32,

    #[serde(default = "default_api_circuit_breaker_reset_secs")]
    #[validate(range(min = 1, max = 3600))]
    pub circuit_breaker_reset_secs: u64
}

pub(crate) fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

pub(crate) fn default_api_timeout_secs() -> u64 {
    30
}

pub(crate) fn default_api_max_retries() -> u32 {
    3
}

pub(crate) fn default_api_page_size() -> u32 {
    100
}

pub(crate) fn default_api_max_pages() -> u32 {
    50
}

pub(crate) fn default_api_circuit_breaker_threshold() -> u32 {
    5
}

pub(crate) fn default_api_circuit_breaker_reset_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_api_timeout_secs(),
            max_retries: default_api_max_retries(),
            page_size: default_api_page_size(),
            max_pages: default_api_max_pages(),
            auth_token: None,
            circuit_breaker_threshold: default_api_circuit_breaker_threshold(),
            circuit_breaker_reset_secs: default_api_circuit_breaker_reset_secs()
        }
    }
}

impl ApiConfig {
    /// Short timeouts and a single attempt, pointed at `base_url`.
    #[must_use]
    pub fn for_testing(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: 2,
            max_retries: 1,
            circuit_breaker_threshold: 50,
            circuit_breaker_reset_secs: 1,
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn circuit_breaker_reset(&self) -> Duration {
        Duration::from_secs(self.circuit_breaker_reset_secs)
    }
}

/// Query cache configuration.
///
/// ## Fields
/// - `enabled`: Serve fresh entries without a request (default: true)
/// - `stale_time_secs`: Age after which an entry is re-fetched even if it
///   was never invalidated (default: 60)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    #[serde(default = "default_cache_stale_time_secs")]
    #[validate(range(max = 86400))]
    pub stale_time_secs: u64
}

pub(crate) fn default_cache_enabled() -> bool {
    true
}

pub(crate) fn default_cache_stale_time_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            stale_time_secs: default_cache_stale_time_secs()
        }
    }
}

impl CacheConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ObservabilityConfig {
    /// Logging level used when `RUST_LOG` is not set
    #[serde(default = "default_observability_logging_level")]
    #[validate(custom(function = "validate_logging_level"))]
    pub logging_level: String
}

pub(crate) fn default_observability_logging_level() -> String {
    "info".to_string()
}

fn validate_logging_level(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid logging level"))
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            logging_level: default_observability_logging_level()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.page_size, 100);
        assert!(config.api.auth_token.is_none());
        assert!(config.cache.enabled);
        assert_eq!(config.cache.stale_time(), Duration::from_secs(60));
        assert_eq!(config.observability.logging_level, "info");
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[api]
base_url = "https://lms.example.edu"
"#
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://lms.example.edu");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_for_testing() {
        let api = ApiConfig::for_testing("http://127.0.0.1:9999");
        assert_eq!(api.max_retries, 1);
        assert_eq!(api.timeout(), Duration::from_secs(2));
    }
}

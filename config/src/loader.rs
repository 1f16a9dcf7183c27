//! # Environment Variable Loader
//!
//! Loads configuration from environment variables following 12-factor app
//! principles.
//!
//! # Naming Convention
//! - `GB_API_*`: REST backend settings
//! - `GB_CACHE_*`: query cache settings
//! - `GB_LOG_LEVEL`: logging level

use crate::layer::{ApiLayer, CacheLayer, ConfigLayer, ObservabilityLayer};
use std::env;
use tracing::warn;

/// Load the settings present in the environment.
///
/// Unset variables leave their field unset so lower sources keep their
/// values. Unparsable values are logged and ignored.
///
/// ## Environment Variables
/// - `GB_API_BASE_URL`: Backend root
/// - `GB_API_TIMEOUT_SECONDS`: Request timeout
/// - `GB_API_MAX_RETRIES`: Attempts for transient failures of list reads
/// - `GB_API_PAGE_SIZE`: List page size
/// - `GB_API_MAX_PAGES`: Pages followed per collection
/// - `GB_API_TOKEN`: Bearer token (ignored when empty)
/// - `GB_API_CIRCUIT_BREAKER_THRESHOLD`: Failures before opening
/// - `GB_API_CIRCUIT_BREAKER_RESET_SECONDS`: Half-open delay
/// - `GB_CACHE_ENABLED`: Enable the query cache (true/false)
/// - `GB_CACHE_STALE_TIME_SECONDS`: Entry freshness window
/// - `GB_LOG_LEVEL`: trace/debug/info/warn/error
pub fn load_from_env() -> ConfigLayer {
    ConfigLayer {
        api: load_api_from_env(),
        cache: load_cache_from_env(),
        observability: load_observability_from_env()
    }
}

fn load_api_from_env() -> ApiLayer {
    ApiLayer {
        base_url: env::var("GB_API_BASE_URL").ok(),
        timeout_secs: parse_env("GB_API_TIMEOUT_SECONDS"),
        max_retries: parse_env("GB_API_MAX_RETRIES"),
        page_size: parse_env("GB_API_PAGE_SIZE"),
        max_pages: parse_env("GB_API_MAX_PAGES"),
        auth_token: env::var("GB_API_TOKEN").ok().filter(|t| !t.is_empty()),
        circuit_breaker_threshold: parse_env("GB_API_CIRCUIT_BREAKER_THRESHOLD"),
        circuit_breaker_reset_secs: parse_env("GB_API_CIRCUIT_BREAKER_RESET_SECONDS")
    }
}

fn load_cache_from_env() -> CacheLayer {
    CacheLayer {
        enabled: parse_env("GB_CACHE_ENABLED"),
        stale_time_secs: parse_env("GB_CACHE_STALE_TIME_SECONDS")
    }
}

fn load_observability_from_env() -> ObservabilityLayer {
    ObservabilityLayer {
        logging_level: env::var("GB_LOG_LEVEL").ok()
    }
}

fn parse_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display
{
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(variable = key, value = %raw, error = %e, "Ignoring unparsable environment variable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "GB_API_BASE_URL",
        "GB_API_PAGE_SIZE",
        "GB_API_TOKEN",
        "GB_CACHE_ENABLED",
        "GB_CACHE_STALE_TIME_SECONDS",
        "GB_LOG_LEVEL"
    ];

    fn clear_vars() {
        for var in VARS {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_load_from_env_unset() {
        clear_vars();
        let layer = load_from_env();
        assert!(layer.api.base_url.is_none());
        assert!(layer.cache.enabled.is_none());
        assert!(layer.observability.logging_level.is_none());
    }

    #[test]
    #[serial]
    fn test_load_from_env_overrides() {
        clear_vars();
        unsafe {
            env::set_var("GB_API_BASE_URL", "https://lms.example.edu");
            env::set_var("GB_API_PAGE_SIZE", "25");
            env::set_var("GB_API_TOKEN", "secret");
            env::set_var("GB_CACHE_ENABLED", "false");
            env::set_var("GB_LOG_LEVEL", "debug");
        }

        let layer = load_from_env();
        assert_eq!(layer.api.base_url.as_deref(), Some("https://lms.example.edu"));
        assert_eq!(layer.api.page_size, Some(25));
        assert_eq!(layer.api.auth_token.as_deref(), Some("secret"));
        assert_eq!(layer.cache.enabled, Some(false));
        assert_eq!(layer.observability.logging_level.as_deref(), Some("debug"));

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_default_value_is_still_set() {
        clear_vars();
        unsafe {
            env::set_var("GB_CACHE_ENABLED", "true");
        }

        assert_eq!(load_from_env().cache.enabled, Some(true));

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_unparsable_value_is_ignored() {
        clear_vars();
        unsafe {
            env::set_var("GB_CACHE_STALE_TIME_SECONDS", "soon");
            env::set_var("GB_API_TOKEN", "");
        }

        let layer = load_from_env();
        assert!(layer.cache.stale_time_secs.is_none());
        assert!(layer.api.auth_token.is_none());

        clear_vars();
    }

    #[test]
    fn test_parse_env_missing() {
        let result: Option<u32> = parse_env("GB_NONEXISTENT_VAR");
        assert!(result.is_none());
    }
}

//! # Configuration Validation
//!
//! Validation for all configuration structures using the `validator` crate.

use crate::config::Config;
use validator::Validate;

/// Validate configuration structure.
///
/// ## Validation Rules
/// ### API
/// - `base_url`: 1-2048 characters
/// - `timeout_secs`: 1-300
/// - `max_retries`: 1-10
/// - `page_size`: 1-1000
/// - `max_pages`: 1-10000
/// - `circuit_breaker_threshold`: 1-100
/// - `circuit_breaker_reset_secs`: 1-3600
///
/// ### Cache
/// - `stale_time_secs`: at most 86400
///
/// ### Observability
/// - `logging_level`: must be "trace", "debug", "info", "warn", or "error"
pub fn validate(config: &Config) -> Result<(), validator::ValidationErrors> {
    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_page_size_out_of_range() {
        let mut config = Config::default();
        config.api.page_size = 0;
        assert!(validate(&config).is_err());

        config.api.page_size = 5000;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_empty_base_url() {
        let mut config = Config::default();
        config.api.base_url = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_logging_level() {
        let mut config = Config::default();
        config.observability.logging_level = "verbose".to_string();
        assert!(validate(&config).is_err());

        config.observability.logging_level = "debug".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_stale_time_upper_bound() {
        let mut config = Config::default();
        config.cache.stale_time_secs = 86401;
        assert!(validate(&config).is_err());
    }
}

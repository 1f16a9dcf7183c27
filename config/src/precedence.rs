//! # Configuration Precedence
//!
//! Merges configuration from multiple sources with precedence rules.
//!
//! # Precedence Order
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values (lowest priority)

use std::fmt::Display;

use crate::config::{ApiConfig, CacheConfig, Config, ObservabilityConfig};
use crate::layer::{ApiLayer, CacheLayer, ConfigLayer, ObservabilityLayer};

/// Merge configuration sources with precedence.
///
/// Every field a higher-priority layer sets wins, including a value equal to
/// the default. Fields a layer leaves unset keep the lower source's value.
///
/// ```rust,no_run
/// use config::{Config, load_from_env, load_from_file, merge_configs};
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let from_file = load_from_file(Path::new("gradebook.toml"))?;
///     let from_env = load_from_env();
///     let _config = merge_configs(
///         Config::default(),
///         from_file,
///         "file",
///         from_env,
///         "env",
///         None,
///         "cli"
///     );
///     Ok(())
/// }
/// ```
pub fn merge_configs(
    defaults: Config,
    file_layer: ConfigLayer,
    file_source_name: &str,
    env_layer: ConfigLayer,
    env_source_name: &str,
    cli_layer: Option<ConfigLayer>,
    cli_source_name: &str
) -> Config {
    let mut config = defaults;

    config = merge_with_logging(config, &file_layer, file_source_name);
    config = merge_with_logging(config, &env_layer, env_source_name);

    if let Some(cli) = cli_layer {
        config = merge_with_logging(config, &cli, cli_source_name);
    }

    config
}

fn merge_with_logging(mut base: Config, layer: &ConfigLayer, source_name: &str) -> Config {
    let mut changes = Vec::new();

    merge_api(&mut base.api, &layer.api, &mut changes);
    merge_cache(&mut base.cache, &layer.cache, &mut changes);
    merge_observability(&mut base.observability, &layer.observability, &mut changes);

    if !changes.is_empty() {
        tracing::info!("Configuration from {}: {:?}", source_name, changes);
    }

    base
}

fn apply<T: Clone + Display>(
    target: &mut T,
    value: &Option<T>,
    name: &str,
    changes: &mut Vec<String>
) {
    if let Some(value) = value {
        changes.push(format!("{name} = {value}"));
        target.clone_from(value);
    }
}

fn merge_api(base: &mut ApiConfig, layer: &ApiLayer, changes: &mut Vec<String>) {
    apply(&mut base.base_url, &layer.base_url, "api.base_url", changes);
    apply(&mut base.timeout_secs, &layer.timeout_secs, "api.timeout_secs", changes);
    apply(&mut base.max_retries, &layer.max_retries, "api.max_retries", changes);
    apply(&mut base.page_size, &layer.page_size, "api.page_size", changes);
    apply(&mut base.max_pages, &layer.max_pages, "api.max_pages", changes);
    if let Some(token) = &layer.auth_token {
        changes.push("api.auth_token = ***".to_string());
        base.auth_token = Some(token.clone());
    }
    apply(
        &mut base.circuit_breaker_threshold,
        &layer.circuit_breaker_threshold,
        "api.circuit_breaker_threshold",
        changes
    );
    apply(
        &mut base.circuit_breaker_reset_secs,
        &layer.circuit_breaker_reset_secs,
        "api.circuit_breaker_reset_secs",
        changes
    );
}

fn merge_cache(base: &mut CacheConfig, layer: &CacheLayer, changes: &mut Vec<String>) {
    apply(&mut base.enabled, &layer.enabled, "cache.enabled", changes);
    apply(
        &mut base.stale_time_secs,
        &layer.stale_time_secs,
        "cache.stale_time_secs",
        changes
    );
}

fn merge_observability(
    base: &mut ObservabilityConfig,
    layer: &ObservabilityLayer,
    changes: &mut Vec<String>
) {
    apply(
        &mut base.logging_level,
        &layer.logging_level,
        "observability.logging_level",
        changes
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge(file: ConfigLayer, env: ConfigLayer, cli: Option<ConfigLayer>) -> Config {
        merge_configs(Config::default(), file, "file", env, "env", cli, "cli")
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = ConfigLayer::with_base_url("https://file.example.edu");
        file.api.page_size = Some(20);

        let env = ConfigLayer::with_base_url("https://env.example.edu");

        let merged = merge(file, env, None);
        assert_eq!(merged.api.base_url, "https://env.example.edu");
        assert_eq!(merged.api.page_size, 20);
    }

    #[test]
    fn test_cli_has_highest_priority() {
        let mut env = ConfigLayer::default();
        env.observability.logging_level = Some("warn".to_string());

        let mut cli = ConfigLayer::default();
        cli.observability.logging_level = Some("trace".to_string());
        cli.cache.enabled = Some(false);

        let merged = merge(ConfigLayer::default(), env, Some(cli));
        assert_eq!(merged.observability.logging_level, "trace");
        assert!(!merged.cache.enabled);
    }

    #[test]
    fn test_unset_fields_do_not_clobber() {
        let mut file = ConfigLayer::default();
        file.api.auth_token = Some("from-file".to_string());
        file.cache.stale_time_secs = Some(5);

        let merged = merge(file, ConfigLayer::default(), Some(ConfigLayer::default()));
        assert_eq!(merged.api.auth_token.as_deref(), Some("from-file"));
        assert_eq!(merged.cache.stale_time_secs, 5);
    }

    #[test]
    fn test_env_default_value_beats_file() {
        let mut file = ConfigLayer::default();
        file.cache.enabled = Some(false);

        let mut env = ConfigLayer::default();
        env.cache.enabled = Some(true);

        let merged = merge(file, env, None);
        assert!(merged.cache.enabled);
    }

    #[test]
    fn test_cli_default_value_beats_file() {
        let file = ConfigLayer::with_base_url("http://file.example");
        let cli = ConfigLayer::with_base_url(ApiConfig::default().base_url);

        let merged = merge(file, ConfigLayer::default(), Some(cli));
        assert_eq!(merged.api.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_no_layers_yields_defaults() {
        let merged = merge(ConfigLayer::default(), ConfigLayer::default(), None);
        assert_eq!(merged, Config::default());
    }
}

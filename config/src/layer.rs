//! # Configuration Layers
//!
//! A layer holds only the settings one source actually provided. Every field
//! is optional: `None` means the source said nothing about it, so a lower
//! source (or the default) keeps its value. A source that sets a field to the
//! default value still wins.

use serde::Deserialize;

/// Settings supplied by a single source (file, environment or flags).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigLayer {
    #[serde(default)]
    pub api: ApiLayer,

    #[serde(default)]
    pub cache: CacheLayer,

    #[serde(default)]
    pub observability: ObservabilityLayer
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiLayer {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub page_size: Option<u32>,
    pub max_pages: Option<u32>,
    pub auth_token: Option<String>,
    pub circuit_breaker_threshold: Option<u32>,
    pub circuit_breaker_reset_secs: Option<u64>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CacheLayer {
    pub enabled: Option<bool>,
    pub stale_time_secs: Option<u64>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ObservabilityLayer {
    pub logging_level: Option<String>
}

impl ConfigLayer {
    /// A layer that only sets the backend root.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiLayer {
                base_url: Some(base_url.into()),
                ..ApiLayer::default()
            },
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_stay_unset() {
        let layer: ConfigLayer = toml::from_str(
            r#"
[cache]
enabled = true
"#
        )
        .unwrap();
        assert_eq!(layer.cache.enabled, Some(true));
        assert!(layer.cache.stale_time_secs.is_none());
        assert!(layer.api.base_url.is_none());
        assert!(layer.observability.logging_level.is_none());
    }

    #[test]
    fn test_with_base_url() {
        let layer = ConfigLayer::with_base_url("http://localhost:8080");
        assert_eq!(layer.api.base_url.as_deref(), Some("http://localhost:8080"));
        assert!(!layer.is_empty());
        assert!(ConfigLayer::default().is_empty());
    }
}

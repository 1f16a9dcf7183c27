//! # Configuration System
//!
//! Configuration management for the Gradebook rubric client.
//!
//! This crate provides:
//! - Configuration structures for the REST backend, query cache and logging
//! - Environment variable loading (12-factor app principles)
//! - Configuration file loading (TOML/YAML)
//! - Configuration layers that record only what each source set
//! - Configuration precedence (CLI > env > file > defaults)
//! - Configuration validation via the `validator` crate

pub mod config;
pub mod file_loader;
pub mod layer;
pub mod loader;
pub mod precedence;
pub mod validation;

pub use config::{ApiConfig, CacheConfig, Config, ObservabilityConfig};
pub use file_loader::{ConfigFileError, load_from_file, load_from_toml, load_from_yaml};
pub use layer::{ApiLayer, CacheLayer, ConfigLayer, ObservabilityLayer};
pub use loader::load_from_env;
pub use precedence::merge_configs;
pub use validation::validate;

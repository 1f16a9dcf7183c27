pub mod criterion;
pub mod rubric;
pub mod scoring;
pub mod tree;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigLayer, load_from_env, load_from_file, merge_configs, validate};
use gb_core::{Identified, RubricApi};
use rubrics::{HttpRubricApi, MutationFailure, MutationOutcome, QueryCache, RubricMutations};
use serde::Serialize;
use serde_json::json;

use crate::output;
use crate::ux_error;

#[derive(Parser)]
#[command(
    name = "gradebook",
    author,
    version,
    about = "Gradebook - browse and edit grading rubrics",
    long_about = "Loads an instructor's rubrics with their criteria and scoring levels, and \
                  creates, updates or deletes any of them.\n\nSettings come from --config, \
                  GB_* environment variables and command-line flags, in that order."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Configuration file (TOML or YAML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend root URL, overriding file and environment
    #[arg(long, global = true)]
    pub base_url: Option<String>
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Show an instructor's rubrics with criteria and scoring levels")]
    Tree(tree::TreeArgs),

    #[command(subcommand, about = "Create, update and delete rubrics")]
    Rubric(rubric::RubricCommand),

    #[command(subcommand, about = "Create, update and delete criteria of a rubric")]
    Criterion(criterion::CriterionCommand),

    #[command(subcommand, about = "Create, update and delete scoring levels of a criterion")]
    Scoring(scoring::ScoringCommand)
}

/// Merge defaults, `--config`, environment and flags, then validate.
pub fn resolve_config(global: &GlobalArgs) -> anyhow::Result<Config> {
    let file_layer = match &global.config {
        Some(path) => load_from_file(path).map_err(|e| {
            ux_error::invalid_config(&path.display().to_string(), &e.to_string()).display();
            anyhow::anyhow!("Failed to load configuration file")
        })?,
        None => ConfigLayer::default()
    };
    let cli_layer = global.base_url.as_deref().map(ConfigLayer::with_base_url);

    let config = merge_configs(
        Config::default(),
        file_layer,
        "file",
        load_from_env(),
        "env",
        cli_layer,
        "cli"
    );

    validate(&config).map_err(|e| {
        ux_error::invalid_config("merged settings", &e.to_string()).display();
        anyhow::anyhow!("Invalid configuration")
    })?;
    Ok(config)
}

pub(crate) fn connect(config: &Config) -> anyhow::Result<Arc<dyn RubricApi>> {
    let api = HttpRubricApi::new(config.api.clone()).map_err(|e| {
        ux_error::from_api_error(&e).display();
        anyhow::anyhow!("Cannot create backend client")
    })?;
    Ok(Arc::new(api))
}

pub(crate) fn mutations(config: &Config) -> anyhow::Result<RubricMutations> {
    let api = connect(config)?;
    let cache = Arc::new(QueryCache::from_config(&config.cache));
    Ok(RubricMutations::new(api, cache))
}

/// Print the outcome of a create or update.
pub(crate) fn report_saved<T>(
    result: Result<MutationOutcome<T>, MutationFailure>,
    json: bool
) -> anyhow::Result<()>
where
    T: Identified + Serialize
{
    let outcome = result.map_err(report_failure)?;
    if json {
        let output = json!({
            "message": outcome.notification.message,
            "data": outcome.data
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    output::success(&outcome.notification.message);
    if let Some(data) = &outcome.data {
        output::hint(&format!("uuid: {}", data.uuid()));
    }
    Ok(())
}

/// Print the outcome of a delete.
pub(crate) fn report_deleted(
    result: Result<MutationOutcome<()>, MutationFailure>,
    json: bool
) -> anyhow::Result<()> {
    let outcome = result.map_err(report_failure)?;
    if json {
        let output = json!({ "message": outcome.notification.message });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        output::success(&outcome.notification.message);
    }
    Ok(())
}

fn report_failure(failure: MutationFailure) -> anyhow::Error {
    ux_error::mutation_failed(&failure).display();
    failure.into()
}

/// Parse an optional yes/no flag value.
pub(crate) fn parse_flag(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        other => Err(format!("expected true or false, got '{other}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;

    fn global(config: Option<PathBuf>, base_url: Option<&str>) -> GlobalArgs {
        GlobalArgs {
            config,
            base_url: base_url.map(str::to_string)
        }
    }

    fn clear_env() {
        unsafe {
            env::remove_var("GB_API_BASE_URL");
            env::remove_var("GB_API_PAGE_SIZE");
            env::remove_var("GB_CACHE_ENABLED");
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_sources() {
        clear_env();
        let config = resolve_config(&global(None, None)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_flag_beats_env_and_file() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[api]\nbase_url = \"http://file.example\"\npage_size = 25"
        )
        .unwrap();
        unsafe {
            env::set_var("GB_API_BASE_URL", "http://env.example");
        }

        let from_env = resolve_config(&global(Some(file.path().to_path_buf()), None)).unwrap();
        assert_eq!(from_env.api.base_url, "http://env.example");
        assert_eq!(from_env.api.page_size, 25);

        let from_flag = resolve_config(&global(
            Some(file.path().to_path_buf()),
            Some("http://flag.example")
        ))
        .unwrap();
        assert_eq!(from_flag.api.base_url, "http://flag.example");
        assert_eq!(from_flag.api.page_size, 25);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_flag_with_default_url_beats_file() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[api]\nbase_url = \"http://file.example\"").unwrap();

        let config = resolve_config(&global(
            Some(file.path().to_path_buf()),
            Some("http://localhost:8080")
        ))
        .unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080");
    }

    #[test]
    #[serial]
    fn test_env_default_value_beats_file() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[cache]\nenabled = false").unwrap();
        unsafe {
            env::set_var("GB_CACHE_ENABLED", "true");
        }

        let config = resolve_config(&global(Some(file.path().to_path_buf()), None)).unwrap();
        assert!(config.cache.enabled);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_file_is_rejected() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[api]\npage_size = 0").unwrap();

        assert!(resolve_config(&global(Some(file.path().to_path_buf()), None)).is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("yes"), Ok(true));
        assert_eq!(parse_flag("FALSE"), Ok(false));
        assert!(parse_flag("maybe").is_err());
    }
}

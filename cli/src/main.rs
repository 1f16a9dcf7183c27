use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;
pub mod ux_error;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::resolve_config(&cli.global)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.logging_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Tree(args) => commands::tree::run(args, &config).await,
        Commands::Rubric(cmd) => commands::rubric::run(cmd, &config).await,
        Commands::Criterion(cmd) => commands::criterion::run(cmd, &config).await,
        Commands::Scoring(cmd) => commands::scoring::run(cmd, &config).await
    }
}

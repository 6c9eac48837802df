//! Verity CLI - Command-line interface for the fact-check pipeline.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use verity_cli::commands;
use verity_cli::{Cli, Command, Config, Formatter};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> verity_cli::Result<()> {
    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load config: an explicit path must exist, the default one may not
    let config = match &cli.config {
        Some(path) => Config::load_from(&PathBuf::from(path))?,
        None => Config::load().unwrap_or_default(),
    };

    // Determine output format and color setting
    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Check(args) => {
            commands::execute_check(args, &config, &formatter).await?;
        }
        Command::Credits(args) => {
            commands::execute_credits(args, &config, &formatter).await?;
        }
        Command::Reward(args) => {
            commands::execute_reward(args, &config, &formatter).await?;
        }
    }

    Ok(())
}

//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};

/// Verity CLI - Check claims against the fact-checking backend.
#[derive(Debug, Parser)]
#[command(name = "verity")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (ratings only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract claims from text and fact-check them
    Check(CheckArgs),

    /// Show the credit balances for the configured wallet
    Credits(CreditsArgs),

    /// Submit a feedback reward for a completed check
    Reward(RewardArgs),
}

/// Arguments for the check command.
#[derive(Debug, Parser)]
pub struct CheckArgs {
    /// The claim or text to check (3-1000 characters)
    pub query: String,
}

/// Arguments for the credits command.
#[derive(Debug, Parser)]
pub struct CreditsArgs {
    /// Wallet to query, overriding the configured one
    #[arg(short, long)]
    pub wallet: Option<String>,
}

/// Arguments for the reward command.
#[derive(Debug, Parser)]
pub struct RewardArgs {
    /// Task id of the check the feedback refers to
    pub task_id: String,

    /// Reward kind
    #[arg(short, long, default_value = "feedback")]
    pub kind: String,

    /// Whether the feedback included written comments (earns the bonus)
    #[arg(long)]
    pub with_comment: bool,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

//! Reward command implementation.

use crate::cli::RewardArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use verity_domain::feedback_reward;
use verity_provider::{CheckBackend, Credential, HttpBackend, RewardRequest};

/// Execute the reward command.
pub async fn execute_reward(
    args: RewardArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let credential = config.credential();
    if matches!(credential, Credential::Anonymous) {
        return Err(CliError::NotSignedIn);
    }
    let wallet = config.require_wallet()?;

    if args.task_id.trim().is_empty() {
        return Err(CliError::InvalidInput("task_id must not be empty".into()));
    }

    let points = feedback_reward(args.with_comment);
    let backend = HttpBackend::new(&config.backend_url, credential);

    let outcome = backend
        .reward_points(&RewardRequest {
            task_id: args.task_id.clone(),
            user_email: wallet.to_string(),
            points,
            url: String::new(),
            kind: args.kind.clone(),
        })
        .await?;

    if outcome.success {
        println!(
            "{}",
            formatter.success(&format!("Rewarded {} points: {}", points, outcome.message))
        );
        if let Some(lifetime) = outcome.lifetime_credits {
            println!("{}", formatter.info(&format!("Points balance: {}", lifetime)));
        }
    } else {
        println!("{}", formatter.error(&outcome.message));
    }

    Ok(())
}

//! Credits command implementation.

use crate::cli::CreditsArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::sync::Arc;
use verity_credits::CreditMirror;
use verity_provider::{Credential, HttpBackend};

/// Execute the credits command.
pub async fn execute_credits(
    args: CreditsArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let credential = config.credential();
    if matches!(credential, Credential::Anonymous) {
        return Err(CliError::NotSignedIn);
    }

    let wallet = match args.wallet.as_deref() {
        Some(wallet) => wallet,
        None => config.require_wallet()?,
    };

    let backend = Arc::new(HttpBackend::new(&config.backend_url, credential));
    let mirror = CreditMirror::new(backend, wallet);

    let snapshot = mirror.refetch().await?;
    println!("{}", formatter.format_credits(&snapshot)?);

    Ok(())
}

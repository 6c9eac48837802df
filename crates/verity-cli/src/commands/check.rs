//! Check command implementation.

use crate::cli::CheckArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use std::sync::Arc;
use verity_credits::CreditMirror;
use verity_domain::UserIdentity;
use verity_pipeline::{CancelFlag, Dispatcher, PipelineConfig};
use verity_provider::{Credential, HttpBackend};

/// Execute the check command.
pub async fn execute_check(
    args: CheckArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let credential = config.credential();
    let authenticated = !matches!(credential, Credential::Anonymous);

    let backend = Arc::new(HttpBackend::new(&config.backend_url, credential));
    let mut dispatcher = Dispatcher::new(Arc::clone(&backend), PipelineConfig::default());

    // Identity enables task-id attachment and the credit mirror
    let mirror = match (&config.wallet_id, authenticated) {
        (Some(wallet), true) => {
            dispatcher = dispatcher.with_identity(UserIdentity::new(wallet.clone()));

            let mirror = Arc::new(CreditMirror::new(Arc::clone(&backend), wallet.clone()));
            // The balance is display state; a failed fetch must not block
            // the check itself
            if let Err(e) = mirror.fetch().await {
                eprintln!("{}", formatter.info(&format!("Credits unavailable: {}", e)));
            }
            dispatcher = dispatcher.with_credit_mirror(Arc::clone(&mirror));
            Some(mirror)
        }
        _ => None,
    };

    // Stream batch progress to stderr while the run is in flight
    let mut progress_rx = dispatcher.sink().subscribe();
    let progress_task = tokio::spawn(async move {
        while progress_rx.changed().await.is_ok() {
            let progress = *progress_rx.borrow();
            if progress.total > 0 {
                eprintln!("{}/{} claims checked", progress.completed, progress.total);
            }
        }
    });

    let outcome = dispatcher.run(&args.query, &CancelFlag::new()).await;
    progress_task.abort();

    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            // Drain side tasks before reporting, then surface the error
            dispatcher.shutdown().await;
            return Err(e.into());
        }
    };

    println!("{}", formatter.format_records(&summary.records)?);

    if let Some(mirror) = &mirror {
        if let Some(snapshot) = mirror.predicted() {
            eprintln!(
                "{}",
                formatter.info(&format!(
                    "{} fact-checking credits remaining (local estimate)",
                    snapshot.daily_credits
                ))
            );
        }
    }

    dispatcher.shutdown().await;
    Ok(())
}

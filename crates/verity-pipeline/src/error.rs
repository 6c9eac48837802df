//! Error types for the pipeline

use thiserror::Error;
use verity_domain::QueryRejection;
use verity_provider::ProviderError;

/// Errors that abort a dispatch cycle
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input failed local validation; no network call was made
    #[error("{0}")]
    Rejected(#[from] QueryRejection),

    /// The extraction call failed; the cycle is aborted
    #[error("Claim extraction failed: {0}")]
    Extraction(ProviderError),

    /// Another cycle is already running on this dispatcher
    #[error("A fact-check is already in progress")]
    Busy,
}

//! Verity Provider Layer
//!
//! The client side of the external fact-checking backend.
//!
//! # Architecture
//!
//! This crate defines the [`CheckBackend`] trait consumed by the pipeline and
//! two implementations:
//!
//! - [`MockBackend`]: deterministic in-memory backend for testing
//! - [`HttpBackend`]: the real reqwest client
//!
//! It also owns the typed decoder for the provider's newline-delimited
//! response format (see [`decode`]).
//!
//! Every call is attempted exactly once per logical step: there is no retry
//! policy at this layer.

#![warn(missing_docs)]

pub mod decode;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use verity_domain::{CreditSnapshot, ExtractedClaim, Rating, SessionId, Verdict};

pub use decode::{decode_check_response, DecodedCheck};
pub use http::{Credential, HttpBackend};

/// Errors that can occur talking to the fact-check backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network or transport failure before an HTTP status was received
    #[error("Communication error: {0}")]
    Communication(String),

    /// Non-success HTTP response
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status code returned by the backend
        status: u16,
        /// Message taken from the response body, when available
        message: String,
    },

    /// No credential available for an endpoint that requires one
    #[error("No access token available. Please sign in.")]
    Unauthorized,

    /// Response body could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// The HTTP status associated with this error, when one applies
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            ProviderError::Unauthorized => Some(401),
            _ => None,
        }
    }
}

/// One verification request for a single claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    /// The claim text to verify
    pub claim: String,

    /// Speaker attribution forwarded to the provider
    pub speaker: Option<String>,

    /// Caller identifier, forwarded as `userEmail` when present
    pub user_email: Option<String>,

    /// Provider-side timeout, passed through as a request parameter
    pub timeout_secs: u64,
}

impl CheckRequest {
    /// Build a request for a claim with the given provider-side timeout
    pub fn new(claim: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            claim: claim.into(),
            speaker: None,
            user_email: None,
            timeout_secs,
        }
    }
}

/// The decoded result of one verification call
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    /// Verdict, when the response carried a `final` fragment
    pub verdict: Option<Verdict>,

    /// Sources announced in `verifying source` fragments, in arrival order
    pub verifying_sources: Vec<String>,

    /// Provider-assigned task identifier, when present
    pub task_id: Option<String>,

    /// The raw payload, preserved verbatim for display and records
    pub raw: serde_json::Value,

    /// HTTP status of the call
    pub status: u16,
}

/// Request body for a reward-points call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardRequest {
    /// Task identifier the reward is attached to
    pub task_id: String,

    /// Caller identifier (the backend names this field `userEmail`)
    #[serde(rename = "userEmail")]
    pub user_email: String,

    /// Points to award
    pub points: u64,

    /// URL-encoded page the action happened on
    pub url: String,

    /// Reward kind: "feedback" or "share"
    #[serde(rename = "type")]
    pub kind: String,
}

/// Acknowledgement of a reward-points call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardOutcome {
    /// Whether the reward was applied server-side
    #[serde(default)]
    pub success: bool,

    /// Human-readable status message
    #[serde(default)]
    pub message: String,

    /// New total after the reward, when the backend reports it
    #[serde(rename = "updatedCredits", default)]
    pub updated_credits: Option<u64>,

    /// Daily balance after the reward
    #[serde(rename = "dailyCredits", default)]
    pub daily_credits: Option<u64>,

    /// Lifetime balance after the reward
    #[serde(rename = "lifetimeCredits", default)]
    pub lifetime_credits: Option<u64>,

    /// Community balance after the reward
    #[serde(rename = "communityCredits", default)]
    pub community_credits: Option<u64>,
}

/// The operations the pipeline needs from the fact-check backend
#[async_trait]
pub trait CheckBackend: Send + Sync {
    /// Turn raw input into zero or more discrete claims
    async fn extract_claims(&self, query: &str) -> Result<Vec<ExtractedClaim>, ProviderError>;

    /// Verify one claim
    async fn fact_check(&self, request: &CheckRequest) -> Result<CheckOutcome, ProviderError>;

    /// Attach a provider task id to a search session (best-effort side call)
    async fn attach_task_id(
        &self,
        session_id: &SessionId,
        task_id: &str,
    ) -> Result<(), ProviderError>;

    /// Fetch the authoritative credit snapshot for a wallet
    async fn check_credits(&self, wallet_id: &str) -> Result<CreditSnapshot, ProviderError>;

    /// Fetch the provider-defined profile payload for a wallet
    async fn get_user_profile(&self, wallet_id: &str) -> Result<serde_json::Value, ProviderError>;

    /// Award points for a feedback or share action
    async fn reward_points(&self, request: &RewardRequest) -> Result<RewardOutcome, ProviderError>;
}

/// Scripted behavior for one claim in the mock backend
#[derive(Debug, Clone)]
enum MockCheck {
    Outcome {
        verdict: Option<Verdict>,
        task_id: Option<String>,
    },
    Error(String),
}

/// Mock backend for deterministic testing
///
/// Returns pre-configured responses without any network calls, counts calls
/// per endpoint, and tracks the peak number of concurrent `fact_check`
/// calls so tests can assert the dispatcher's batch bound.
///
/// # Examples
///
/// ```
/// use verity_provider::{CheckBackend, MockBackend};
///
/// # tokio_test::block_on(async {
/// let backend = MockBackend::new();
/// let claims = backend.extract_claims("water is wet").await.unwrap();
/// assert_eq!(claims.len(), 1);
/// assert_eq!(backend.extract_calls(), 1);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    claims: Arc<Mutex<HashMap<String, Vec<ExtractedClaim>>>>,
    extract_errors: Arc<Mutex<HashMap<String, String>>>,
    checks: Arc<Mutex<HashMap<String, MockCheck>>>,
    credits: Arc<Mutex<CreditSnapshot>>,
    fail_attach: Arc<AtomicBool>,
    check_delay_ms: Arc<AtomicUsize>,
    extract_count: Arc<AtomicUsize>,
    check_count: Arc<AtomicUsize>,
    attach_count: Arc<AtomicUsize>,
    credit_count: Arc<AtomicUsize>,
    reward_count: Arc<AtomicUsize>,
    in_flight_checks: Arc<AtomicUsize>,
    max_in_flight_checks: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Create a mock with default behavior: extraction yields the query as a
    /// single claim, every check succeeds with a True verdict and no task id.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the claims returned for a specific query
    pub fn add_claims(&self, query: impl Into<String>, claims: Vec<ExtractedClaim>) {
        self.claims.lock().unwrap().insert(query.into(), claims);
    }

    /// Script an extraction failure for a specific query
    pub fn add_extract_error(&self, query: impl Into<String>, message: impl Into<String>) {
        self.extract_errors
            .lock()
            .unwrap()
            .insert(query.into(), message.into());
    }

    /// Script the outcome for a specific claim text
    pub fn add_check_outcome(
        &self,
        claim: impl Into<String>,
        verdict: Option<Verdict>,
        task_id: Option<String>,
    ) {
        self.checks
            .lock()
            .unwrap()
            .insert(claim.into(), MockCheck::Outcome { verdict, task_id });
    }

    /// Script a check failure for a specific claim text
    pub fn add_check_error(&self, claim: impl Into<String>, message: impl Into<String>) {
        self.checks
            .lock()
            .unwrap()
            .insert(claim.into(), MockCheck::Error(message.into()));
    }

    /// Set the snapshot returned by `check_credits`
    pub fn set_credits(&self, snapshot: CreditSnapshot) {
        *self.credits.lock().unwrap() = snapshot;
    }

    /// Make every `attach_task_id` call fail
    pub fn fail_attach(&self) {
        self.fail_attach.store(true, Ordering::SeqCst);
    }

    /// Delay each `fact_check` call, so concurrent calls overlap in tests
    pub fn set_check_delay_ms(&self, millis: usize) {
        self.check_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of `extract_claims` calls made
    pub fn extract_calls(&self) -> usize {
        self.extract_count.load(Ordering::SeqCst)
    }

    /// Number of `fact_check` calls made
    pub fn check_calls(&self) -> usize {
        self.check_count.load(Ordering::SeqCst)
    }

    /// Number of `attach_task_id` calls made
    pub fn attach_calls(&self) -> usize {
        self.attach_count.load(Ordering::SeqCst)
    }

    /// Number of `check_credits` calls made
    pub fn credit_calls(&self) -> usize {
        self.credit_count.load(Ordering::SeqCst)
    }

    /// Number of `reward_points` calls made
    pub fn reward_calls(&self) -> usize {
        self.reward_count.load(Ordering::SeqCst)
    }

    /// Peak number of `fact_check` calls in flight at the same time
    pub fn max_concurrent_checks(&self) -> usize {
        self.max_in_flight_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckBackend for MockBackend {
    async fn extract_claims(&self, query: &str) -> Result<Vec<ExtractedClaim>, ProviderError> {
        self.extract_count.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.extract_errors.lock().unwrap().get(query) {
            return Err(ProviderError::Communication(message.clone()));
        }

        if let Some(claims) = self.claims.lock().unwrap().get(query) {
            return Ok(claims.clone());
        }

        Ok(vec![ExtractedClaim::new(query)])
    }

    async fn fact_check(&self, request: &CheckRequest) -> Result<CheckOutcome, ProviderError> {
        self.check_count.fetch_add(1, Ordering::SeqCst);

        let current = self.in_flight_checks.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight_checks
            .fetch_max(current, Ordering::SeqCst);

        let delay = self.check_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay as u64)).await;
        }

        let scripted = self.checks.lock().unwrap().get(&request.claim).cloned();
        let result = match scripted {
            Some(MockCheck::Error(message)) => Err(ProviderError::Http {
                status: 500,
                message,
            }),
            Some(MockCheck::Outcome { verdict, task_id }) => Ok(CheckOutcome {
                verdict,
                verifying_sources: Vec::new(),
                task_id,
                raw: serde_json::json!({"mock": true}),
                status: 200,
            }),
            None => Ok(CheckOutcome {
                verdict: Some(Verdict::new(Rating::True, "Mock assessment")),
                verifying_sources: Vec::new(),
                task_id: None,
                raw: serde_json::json!({"mock": true}),
                status: 200,
            }),
        };

        self.in_flight_checks.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn attach_task_id(
        &self,
        _session_id: &SessionId,
        _task_id: &str,
    ) -> Result<(), ProviderError> {
        self.attach_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_attach.load(Ordering::SeqCst) {
            return Err(ProviderError::Http {
                status: 500,
                message: "mock attach failure".to_string(),
            });
        }
        Ok(())
    }

    async fn check_credits(&self, _wallet_id: &str) -> Result<CreditSnapshot, ProviderError> {
        self.credit_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.credits.lock().unwrap().clone())
    }

    async fn get_user_profile(&self, wallet_id: &str) -> Result<serde_json::Value, ProviderError> {
        Ok(serde_json::json!({ "wallet_id": wallet_id }))
    }

    async fn reward_points(&self, request: &RewardRequest) -> Result<RewardOutcome, ProviderError> {
        self.reward_count.fetch_add(1, Ordering::SeqCst);
        Ok(RewardOutcome {
            success: true,
            message: format!("rewarded {} points", request.points),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_default_extraction() {
        let backend = MockBackend::new();
        let claims = backend.extract_claims("the sky is blue").await.unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].text, "the sky is blue");
        assert_eq!(backend.extract_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_scripted_claims() {
        let backend = MockBackend::new();
        backend.add_claims(
            "two facts",
            vec![ExtractedClaim::new("fact one"), ExtractedClaim::new("fact two")],
        );

        let claims = backend.extract_claims("two facts").await.unwrap();
        assert_eq!(claims.len(), 2);
    }

    #[tokio::test]
    async fn test_mock_extract_error() {
        let backend = MockBackend::new();
        backend.add_extract_error("bad input", "connection reset");

        let result = backend.extract_claims("bad input").await;
        assert!(matches!(result, Err(ProviderError::Communication(_))));
    }

    #[tokio::test]
    async fn test_mock_check_default_verdict() {
        let backend = MockBackend::new();
        let outcome = backend
            .fact_check(&CheckRequest::new("anything", 60))
            .await
            .unwrap();
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.verdict.unwrap().rating, Rating::True);
    }

    #[tokio::test]
    async fn test_mock_check_error_and_counts() {
        let backend = MockBackend::new();
        backend.add_check_error("broken", "upstream exploded");

        let result = backend.fact_check(&CheckRequest::new("broken", 60)).await;
        assert!(matches!(
            result,
            Err(ProviderError::Http { status: 500, .. })
        ));
        assert_eq!(backend.check_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_attach_failure_injection() {
        let backend = MockBackend::new();
        backend.fail_attach();

        let result = backend
            .attach_task_id(&SessionId::new(), "task-9")
            .await;
        assert!(result.is_err());
        assert_eq!(backend.attach_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_clone_shares_state() {
        let backend = MockBackend::new();
        let clone = backend.clone();

        backend.extract_claims("shared").await.unwrap();
        assert_eq!(clone.extract_calls(), 1);
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ProviderError::Unauthorized.status(), Some(401));
        assert_eq!(
            ProviderError::Http {
                status: 502,
                message: "bad".into()
            }
            .status(),
            Some(502)
        );
        assert_eq!(
            ProviderError::Communication("down".into()).status(),
            None
        );
    }

    #[test]
    fn test_reward_request_wire_names() {
        let request = RewardRequest {
            task_id: "t1".into(),
            user_email: "0xabc".into(),
            points: 3,
            url: "".into(),
            kind: "feedback".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("userEmail").is_some());
        assert!(json.get("type").is_some());
        assert!(json.get("kind").is_none());
    }
}

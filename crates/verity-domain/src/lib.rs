//! Verity Domain
//!
//! Core types shared by every Verity crate: check identifiers and records,
//! extracted claims, validated search queries, per-search session identifiers,
//! verdicts, and the client-side credit snapshot.
//!
//! This crate is deliberately small and dependency-light. Everything here is a
//! plain value type; no I/O, no async, no global state.

#![warn(missing_docs)]

pub mod check;
pub mod claim;
pub mod credits;
pub mod query;
pub mod session;
pub mod verdict;

pub use check::{CheckId, FactCheckRecord};
pub use claim::ExtractedClaim;
pub use credits::{
    feedback_reward, CreditSnapshot, FACT_CHECK_COST, FEEDBACK_BASE_REWARD, FEEDBACK_TEXT_BONUS,
};
pub use query::{QueryRejection, SearchQuery, MAX_QUERY_CHARS, MIN_QUERY_CHARS};
pub use session::SessionId;
pub use verdict::{Rating, Verdict};

/// The identity of an authenticated caller, as far as this stack needs it.
///
/// The wallet id doubles as the user identifier on the fact-check backend
/// (the backend calls it `userEmail` on some endpoints). No credentials are
/// stored here; token handling lives with the provider client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// Wallet identifier, used as `wallet_id` / `userEmail` on backend calls
    pub wallet_id: String,

    /// Display name from the identity provider, if any
    pub display_name: Option<String>,
}

impl UserIdentity {
    /// Create an identity from a wallet id
    pub fn new(wallet_id: impl Into<String>) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            display_name: None,
        }
    }
}

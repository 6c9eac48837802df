//! Verity Credits
//!
//! Client-side mirror of the server-authoritative credit balances.
//!
//! The mirror is a cache with optimistic prediction, nothing more: it fetches
//! the snapshot once per authenticated session, applies the fixed check cost
//! and feedback rewards locally, and only converges with the server again on
//! an explicit [`CreditMirror::refetch`]. Callers must treat the predicted
//! value as display state, never as an authorization decision.

#![warn(missing_docs)]

mod mirror;

pub use mirror::CreditMirror;

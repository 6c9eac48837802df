//! Check identifiers and completed verification records

use crate::session::SessionId;
use crate::verdict::Verdict;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for one verification run record, based on UUIDv7
///
/// UUIDv7 gives chronological sortability (records display in the order they
/// completed) and requires no coordination between concurrent batch members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CheckId(u128);

impl CheckId {
    /// Generate a new UUIDv7-based CheckId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Parse a CheckId from its canonical UUID string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid check id: {}", e))
    }

    /// Raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Millisecond Unix timestamp embedded in the identifier
    pub fn timestamp_ms(&self) -> u64 {
        // UUIDv7: top 48 bits are the Unix millisecond timestamp
        (self.0 >> 80) as u64
    }
}

impl Default for CheckId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl Serialize for CheckId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CheckId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CheckId::from_string(&s).map_err(serde::de::Error::custom)
    }
}

/// The immutable record of one completed verification call
///
/// A record is created when the dispatch call resolves, successfully or not,
/// and never mutated afterwards. It lives as long as the owning search
/// session and is discarded on reset. A failed best-effort side call (task-id
/// attachment) never alters a record that has already been written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckRecord {
    /// Record identifier
    pub id: CheckId,

    /// The claim text that was checked
    pub claim: String,

    /// Decoded verdict, when the provider returned one
    pub verdict: Option<Verdict>,

    /// Raw provider payload, preserved even when no verdict decoded
    pub raw: Option<serde_json::Value>,

    /// Human-readable error when the call failed
    pub error: Option<String>,

    /// HTTP status of the verification call, when one was received
    pub status: Option<u16>,

    /// Unix seconds when the record was created
    pub created_at: u64,

    /// The search session this record belongs to
    pub session_id: SessionId,

    /// Provider-assigned task identifier, used later for feedback/rewards
    pub task_id: Option<String>,
}

impl FactCheckRecord {
    /// Build a record for a call that resolved with a provider response
    pub fn completed(
        claim: impl Into<String>,
        verdict: Option<Verdict>,
        raw: serde_json::Value,
        status: u16,
        session_id: SessionId,
        task_id: Option<String>,
    ) -> Self {
        Self {
            id: CheckId::new(),
            claim: claim.into(),
            verdict,
            raw: Some(raw),
            error: None,
            status: Some(status),
            created_at: unix_now(),
            session_id,
            task_id,
        }
    }

    /// Build a record for a call that failed
    pub fn failed(
        claim: impl Into<String>,
        error: impl Into<String>,
        status: Option<u16>,
        session_id: SessionId,
    ) -> Self {
        Self {
            id: CheckId::new(),
            claim: claim.into(),
            verdict: None,
            raw: None,
            error: Some(error.into()),
            status,
            created_at: unix_now(),
            session_id,
            task_id: None,
        }
    }

    /// Whether the verification call itself succeeded
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_id_chronological() {
        let id1 = CheckId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = CheckId::new();

        assert!(id1 < id2, "Earlier UUIDv7 should sort before later UUIDv7");
        assert!(id1.timestamp_ms() <= id2.timestamp_ms());
    }

    #[test]
    fn test_check_id_display_and_parse() {
        let id = CheckId::new();
        let s = id.to_string();

        // Canonical UUID form: 8-4-4-4-12 with hyphens
        assert_eq!(s.len(), 36);
        assert_eq!(CheckId::from_string(&s).unwrap(), id);
    }

    #[test]
    fn test_check_id_invalid_string() {
        assert!(CheckId::from_string("not-a-uuid").is_err());
        assert!(CheckId::from_string("").is_err());
    }

    #[test]
    fn test_record_completed_is_ok() {
        let session = SessionId::new();
        let record = FactCheckRecord::completed(
            "The Eiffel Tower is 330 meters tall",
            None,
            serde_json::json!({"opaque": true}),
            200,
            session.clone(),
            Some("task-1".to_string()),
        );

        assert!(record.is_ok());
        assert_eq!(record.status, Some(200));
        assert_eq!(record.session_id, session);
        assert_eq!(record.task_id.as_deref(), Some("task-1"));
    }

    #[test]
    fn test_record_failed_carries_error() {
        let record = FactCheckRecord::failed(
            "Some claim",
            "HTTP 502: bad gateway",
            Some(502),
            SessionId::new(),
        );

        assert!(!record.is_ok());
        assert!(record.verdict.is_none());
        assert_eq!(record.error.as_deref(), Some("HTTP 502: bad gateway"));
    }

    #[test]
    fn test_record_serde_round_trip() {
        let record = FactCheckRecord::failed("claim", "timeout", None, SessionId::new());
        let json = serde_json::to_string(&record).unwrap();
        let parsed: FactCheckRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: CheckId ordering matches the underlying value ordering
        #[test]
        fn test_check_id_ordering_property(a: u128, b: u128) {
            let id_a = CheckId(a);
            let id_b = CheckId(b);

            prop_assert_eq!(id_a < id_b, a < b);
            prop_assert_eq!(id_a == id_b, a == b);
        }

        /// Property: round-trip through the string form preserves the id
        #[test]
        fn test_check_id_string_roundtrip(value: u128) {
            let id = CheckId(value);
            let parsed = CheckId::from_string(&id.to_string());
            prop_assert_eq!(parsed, Ok(id));
        }
    }
}

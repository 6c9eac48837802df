//! Credit snapshot and the fixed cost/reward schedule
//!
//! The authoritative balances live server-side. Everything here operates on
//! a local copy; see `verity-credits` for the caching mirror.

use serde::{Deserialize, Serialize};

/// Daily credits spent per completed fact check
pub const FACT_CHECK_COST: u64 = 5;

/// Points awarded for submitting feedback on a check
pub const FEEDBACK_BASE_REWARD: u64 = 3;

/// Additional points when the feedback includes written comments
pub const FEEDBACK_TEXT_BONUS: u64 = 3;

/// A point-in-time copy of the server-side credit balances
///
/// Field names mirror the provider payload. Unknown fields are ignored on
/// deserialization; absent ones default so a partial payload still parses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditSnapshot {
    /// Credits spendable on fact checks, refilled daily
    #[serde(default)]
    pub daily_credits: u64,

    /// Points accumulated through feedback and moderation
    #[serde(default)]
    pub lifetime_credits: u64,

    /// Whether the account has a pro subscription
    #[serde(rename = "isPro", default)]
    pub is_pro: bool,

    /// Temporary credit total granted outside the daily refill
    #[serde(default)]
    pub temp_total: u64,
}

impl CreditSnapshot {
    /// Apply the fixed cost of one completed fact check
    ///
    /// Saturates at zero; the server is the authority on the real balance.
    pub fn apply_check_cost(&mut self) {
        self.daily_credits = self.daily_credits.saturating_sub(FACT_CHECK_COST);
    }

    /// Apply a reward of `points` to the lifetime balance
    pub fn apply_reward(&mut self, points: u64) {
        self.lifetime_credits = self.lifetime_credits.saturating_add(points);
    }
}

/// Points awarded for one feedback submission
pub fn feedback_reward(has_written_comment: bool) -> u64 {
    if has_written_comment {
        FEEDBACK_BASE_REWARD + FEEDBACK_TEXT_BONUS
    } else {
        FEEDBACK_BASE_REWARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_cost_decrements_by_five() {
        let mut snapshot = CreditSnapshot {
            daily_credits: 50,
            ..Default::default()
        };
        snapshot.apply_check_cost();
        assert_eq!(snapshot.daily_credits, 45);
    }

    #[test]
    fn test_check_cost_saturates_at_zero() {
        let mut snapshot = CreditSnapshot {
            daily_credits: 3,
            ..Default::default()
        };
        snapshot.apply_check_cost();
        assert_eq!(snapshot.daily_credits, 0);
    }

    #[test]
    fn test_reward_adds_to_lifetime() {
        let mut snapshot = CreditSnapshot::default();
        snapshot.apply_reward(feedback_reward(true));
        assert_eq!(snapshot.lifetime_credits, 6);
        snapshot.apply_reward(feedback_reward(false));
        assert_eq!(snapshot.lifetime_credits, 9);
    }

    #[test]
    fn test_parses_provider_payload() {
        let json = r#"{
            "daily_credits": 95,
            "lifetime_credits": 12,
            "isPro": false,
            "success": true,
            "temp_total": 0,
            "temp_list": []
        }"#;
        let snapshot: CreditSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.daily_credits, 95);
        assert_eq!(snapshot.lifetime_credits, 12);
        assert!(!snapshot.is_pro);
    }

    #[test]
    fn test_partial_payload_defaults() {
        let snapshot: CreditSnapshot = serde_json::from_str(r#"{"daily_credits": 10}"#).unwrap();
        assert_eq!(snapshot.daily_credits, 10);
        assert_eq!(snapshot.lifetime_credits, 0);
    }
}

//! The credit mirror implementation

use std::sync::{Arc, RwLock};
use tracing::debug;
use verity_domain::CreditSnapshot;
use verity_provider::{CheckBackend, ProviderError};

/// Cached, optimistically-mutated copy of a wallet's credit balances
///
/// One mirror per authenticated session. The first [`fetch`](Self::fetch)
/// hits the backend; later calls return the cached copy until
/// [`refetch`](Self::refetch) forces a reload. Local mutations drift from the
/// server by design; `predicted` names the value honestly.
pub struct CreditMirror<B> {
    backend: Arc<B>,
    wallet_id: String,
    state: RwLock<Option<CreditSnapshot>>,
}

impl<B: CheckBackend> CreditMirror<B> {
    /// Create a mirror for one wallet
    pub fn new(backend: Arc<B>, wallet_id: impl Into<String>) -> Self {
        Self {
            backend,
            wallet_id: wallet_id.into(),
            state: RwLock::new(None),
        }
    }

    /// The wallet this mirror tracks
    pub fn wallet_id(&self) -> &str {
        &self.wallet_id
    }

    /// Fetch the snapshot, using the cache when already loaded
    pub async fn fetch(&self) -> Result<CreditSnapshot, ProviderError> {
        if let Some(snapshot) = self.state.read().unwrap().clone() {
            return Ok(snapshot);
        }
        self.refetch().await
    }

    /// Reload the snapshot from the backend, replacing any local prediction
    pub async fn refetch(&self) -> Result<CreditSnapshot, ProviderError> {
        let snapshot = self.backend.check_credits(&self.wallet_id).await?;
        debug!(
            wallet = %self.wallet_id,
            daily = snapshot.daily_credits,
            lifetime = snapshot.lifetime_credits,
            "Credit snapshot refreshed"
        );
        *self.state.write().unwrap() = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// The current locally-predicted snapshot, if one has been loaded
    ///
    /// Non-authoritative: reflects optimistic local mutations since the last
    /// refetch.
    pub fn predicted(&self) -> Option<CreditSnapshot> {
        self.state.read().unwrap().clone()
    }

    /// Optimistically apply the fixed cost of one completed check
    ///
    /// No-op until a snapshot has been loaded.
    pub fn note_check_completed(&self) {
        if let Some(snapshot) = self.state.write().unwrap().as_mut() {
            snapshot.apply_check_cost();
        }
    }

    /// Optimistically apply a feedback/share reward
    pub fn note_reward(&self, points: u64) {
        if let Some(snapshot) = self.state.write().unwrap().as_mut() {
            snapshot.apply_reward(points);
        }
    }

    /// Drop the cached snapshot, e.g. on sign-out
    pub fn clear(&self) {
        *self.state.write().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verity_provider::MockBackend;

    fn mirror_with_credits(daily: u64) -> CreditMirror<MockBackend> {
        let backend = MockBackend::new();
        backend.set_credits(CreditSnapshot {
            daily_credits: daily,
            lifetime_credits: 10,
            ..Default::default()
        });
        CreditMirror::new(Arc::new(backend), "0xwallet")
    }

    #[tokio::test]
    async fn test_fetch_caches_snapshot() {
        let mirror = mirror_with_credits(50);

        let first = mirror.fetch().await.unwrap();
        let second = mirror.fetch().await.unwrap();
        assert_eq!(first, second);

        // One backend call for both fetches
        assert_eq!(mirror.backend.credit_calls(), 1);
    }

    #[tokio::test]
    async fn test_refetch_replaces_prediction() {
        let mirror = mirror_with_credits(50);
        mirror.fetch().await.unwrap();

        mirror.note_check_completed();
        assert_eq!(mirror.predicted().unwrap().daily_credits, 45);

        let refreshed = mirror.refetch().await.unwrap();
        assert_eq!(refreshed.daily_credits, 50);
        assert_eq!(mirror.predicted().unwrap().daily_credits, 50);
    }

    #[tokio::test]
    async fn test_check_cost_is_five_per_check() {
        let mirror = mirror_with_credits(50);
        mirror.fetch().await.unwrap();

        mirror.note_check_completed();
        mirror.note_check_completed();
        assert_eq!(mirror.predicted().unwrap().daily_credits, 40);
    }

    #[tokio::test]
    async fn test_mutation_before_fetch_is_noop() {
        let mirror = mirror_with_credits(50);
        mirror.note_check_completed();
        assert!(mirror.predicted().is_none());
    }

    #[tokio::test]
    async fn test_reward_increments_lifetime() {
        let mirror = mirror_with_credits(50);
        mirror.fetch().await.unwrap();

        mirror.note_reward(6);
        assert_eq!(mirror.predicted().unwrap().lifetime_credits, 16);
    }

    #[tokio::test]
    async fn test_clear_drops_cache() {
        let mirror = mirror_with_credits(50);
        mirror.fetch().await.unwrap();
        mirror.clear();
        assert!(mirror.predicted().is_none());

        // Next fetch hits the backend again
        mirror.fetch().await.unwrap();
        assert_eq!(mirror.backend.credit_calls(), 2);
    }
}

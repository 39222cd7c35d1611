//! TTL-checked memoization of match results.
//!
//! Cache faults are never allowed to fail an evaluation: a read error is a
//! miss, a write error is logged and dropped. The age check here is
//! authoritative even when the backing store applies its own TTL eviction.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use entities::MatchResult;
use store::{CacheStore, CachedMatch};

pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Fetch a still-valid entry. The returned result is flagged `cached`.
    pub async fn lookup(&self, fingerprint: &str) -> Option<MatchResult> {
        let entry = match self.store.get(fingerprint).await {
            Ok(entry) => entry?,
            Err(err) => {
                warn!(fingerprint, error = %err, "cache read failed; treating as miss");
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(entry.cached_at);
        if age.num_milliseconds() < 0 || age.to_std().ok()? >= self.ttl {
            debug!(fingerprint, "cache entry expired");
            return None;
        }

        let mut result = entry.result;
        result.cached = true;
        Some(result)
    }

    /// Idempotent upsert. Errors are logged and swallowed.
    pub async fn store(&self, fingerprint: &str, result: &MatchResult) {
        let entry = CachedMatch {
            fingerprint: fingerprint.to_string(),
            result: result.clone(),
            cached_at: Utc::now(),
        };
        if let Err(err) = self.store.put(fingerprint, entry, self.ttl).await {
            warn!(fingerprint, error = %err, "cache write failed; continuing without cache");
        }
    }

    /// Purge entries for a company after a profile edit. Best effort.
    pub async fn invalidate_company(&self, company_id: &str) -> usize {
        match self.store.invalidate_company(company_id).await {
            Ok(count) => count,
            Err(err) => {
                warn!(company_id, error = %err, "cache invalidation failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use store::memory::MemoryCacheStore;
    use store::StoreError;

    fn result() -> MatchResult {
        let now = Utc::now();
        MatchResult {
            company_id: "c-1".into(),
            opportunity_id: "o-1".into(),
            total_score: 0.8,
            confidence_level: entities::ConfidenceLevel::High,
            component_scores: BTreeMap::new(),
            match_reasons: vec![],
            recommendations: vec![],
            action_items: vec![],
            status: entities::MatchOutcomeStatus::Ok,
            processing_time_ms: 1.0,
            cached: false,
            created_at: now,
            expires_at: now + chrono::Duration::days(90),
        }
    }

    #[tokio::test]
    async fn round_trip_flags_cached() {
        let cache = ResultCache::new(
            Arc::new(MemoryCacheStore::new()),
            Duration::from_secs(60),
        );
        assert!(cache.lookup("fp-1").await.is_none());
        cache.store("fp-1", &result()).await;
        let hit = cache.lookup("fp-1").await.expect("entry should be valid");
        assert!(hit.cached);
        assert_eq!(hit.total_score, 0.8);
    }

    #[tokio::test]
    async fn zero_ttl_expires_immediately() {
        let cache = ResultCache::new(Arc::new(MemoryCacheStore::new()), Duration::ZERO);
        cache.store("fp-1", &result()).await;
        assert!(cache.lookup("fp-1").await.is_none());
    }

    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        async fn get(&self, _fingerprint: &str) -> Result<Option<CachedMatch>, StoreError> {
            Err(StoreError::transient("cache down"))
        }

        async fn put(
            &self,
            _fingerprint: &str,
            _entry: CachedMatch,
            _ttl: Duration,
        ) -> Result<(), StoreError> {
            Err(StoreError::transient("cache down"))
        }

        async fn invalidate_company(&self, _company_id: &str) -> Result<usize, StoreError> {
            Err(StoreError::transient("cache down"))
        }
    }

    #[tokio::test]
    async fn cache_failures_never_propagate() {
        let cache = ResultCache::new(Arc::new(BrokenCache), Duration::from_secs(60));
        assert!(cache.lookup("fp-1").await.is_none());
        cache.store("fp-1", &result()).await;
        assert_eq!(cache.invalidate_company("c-1").await, 0);
    }
}

//! Shared context handed to every scoring component.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use entities::Embedding;
use filter::CapacityThresholds;
use store::{retry, EmbeddingService, RetryConfig, StoreError, VectorStore};

/// Vector-store key scheme. Embedding artifacts are addressed by entity kind,
/// id, and section; the chunk index is open-ended and probed in order.
pub mod keys {
    pub fn opp_full(notice_id: &str) -> String {
        format!("opp/{notice_id}/full")
    }

    pub fn opp_title(notice_id: &str) -> String {
        format!("opp/{notice_id}/title")
    }

    pub fn opp_description(notice_id: &str) -> String {
        format!("opp/{notice_id}/desc")
    }

    pub fn opp_chunk(notice_id: &str, index: usize) -> String {
        format!("opp/{notice_id}/chunk/{index}")
    }

    pub fn company_full(company_id: &str) -> String {
        format!("company/{company_id}/full")
    }

    pub fn company_capability(company_id: &str) -> String {
        format!("company/{company_id}/capability")
    }
}

/// Tunables consumed by scoring components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringConfig {
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,
    /// Upper bound on document chunks probed for best-chunk similarity.
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    /// Past-performance records younger than this many years count as recent.
    #[serde(default = "default_recency_window_years")]
    pub recency_window_years: i32,
    /// Shared with the quick filter so both layers agree on what "extreme
    /// mismatch" means.
    #[serde(default)]
    pub capacity: CapacityThresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            embedding_dimension: default_embedding_dimension(),
            max_chunks: default_max_chunks(),
            recency_window_years: default_recency_window_years(),
            capacity: CapacityThresholds::default(),
        }
    }
}

fn default_embedding_dimension() -> usize {
    entities::DEFAULT_EMBEDDING_DIMENSION
}

fn default_max_chunks() -> usize {
    16
}

fn default_recency_window_years() -> i32 {
    3
}

/// Everything a scorer may consult beyond the pair itself.
#[derive(Clone)]
pub struct ScoringContext {
    vectors: Arc<dyn VectorStore>,
    /// Optional fallback when a stored vector is missing. `None` means a
    /// missing vector is reported as `missing_embedding`.
    embedder: Option<Arc<dyn EmbeddingService>>,
    pub config: ScoringConfig,
    /// Evaluation date; injected so scoring is reproducible in tests.
    pub today: NaiveDate,
    store_retry: RetryConfig,
    embed_retry: RetryConfig,
}

impl ScoringContext {
    pub fn new(
        vectors: Arc<dyn VectorStore>,
        embedder: Option<Arc<dyn EmbeddingService>>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            vectors,
            embedder,
            config,
            today: Utc::now().date_naive(),
            store_retry: RetryConfig::default(),
            embed_retry: RetryConfig::embedding(),
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Fetch a stored vector, retrying transient store faults.
    pub async fn fetch_vector(&self, key: &str) -> Result<Option<Embedding>, StoreError> {
        let vectors = Arc::clone(&self.vectors);
        retry::run(&self.store_retry, |_| {
            let vectors = Arc::clone(&vectors);
            let key = key.to_string();
            async move { vectors.get(&key).await }
        })
        .await
    }

    /// Generate an embedding for `text` through the fallback service, when one
    /// is configured. Retries rate-limit and transient failures within the
    /// embedding time budget; fatal failures propagate immediately.
    pub async fn embed_fallback(&self, text: &str) -> Result<Option<Embedding>, StoreError> {
        let Some(embedder) = self.embedder.as_ref() else {
            return Ok(None);
        };
        let embedder = Arc::clone(embedder);
        let embedding = retry::run(&self.embed_retry, |_| {
            let embedder = Arc::clone(&embedder);
            let text = text.to_string();
            async move { embedder.embed(&text).await }
        })
        .await?;
        Ok(Some(embedding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::memory::{HashEmbedder, MemoryVectorStore};

    #[test]
    fn key_scheme() {
        assert_eq!(keys::opp_full("n-1"), "opp/n-1/full");
        assert_eq!(keys::opp_chunk("n-1", 3), "opp/n-1/chunk/3");
        assert_eq!(keys::company_capability("c-1"), "company/c-1/capability");
    }

    #[tokio::test]
    async fn embed_fallback_without_service_is_none() {
        let ctx = ScoringContext::new(
            Arc::new(MemoryVectorStore::new()),
            None,
            ScoringConfig::default(),
        );
        assert!(ctx.embed_fallback("text").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn embed_fallback_with_service_embeds() {
        let ctx = ScoringContext::new(
            Arc::new(MemoryVectorStore::new()),
            Some(Arc::new(HashEmbedder::new(32))),
            ScoringConfig::default(),
        );
        let embedding = ctx.embed_fallback("text").await.unwrap().unwrap();
        assert_eq!(embedding.dimension(), 32);
    }
}

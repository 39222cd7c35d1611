//! External adapter seams consumed by the GovMatch core.
//!
//! The matching engine and batch layer never talk to concrete backends; they
//! hold `Arc<dyn Trait>` handles to the interfaces defined here. Production
//! deployments bind these traits to managed services; the [`memory`] module
//! provides complete in-process implementations used by tests, demos, and the
//! default server wiring.
//!
//! Retries are implemented once, in [`retry`], and wrapped around individual
//! adapter calls by the consumers; implementations should surface faults as
//! classified [`StoreError`]s and not retry internally.

pub mod error;
pub mod memory;
pub mod retry;

pub use error::{StoreError, StoreErrorKind};
pub use retry::RetryConfig;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use entities::{
    BatchJob, CompanyProfile, Embedding, JobState, MatchResult, Opportunity, OpportunityFilters,
    ScheduleEntry,
};

/// Paginated catalog scan result.
pub type OpportunityStream = BoxStream<'static, Result<Opportunity, StoreError>>;

/// External embedding generator. Implementations classify failures as
/// `RateLimited`, `Transient`, or `Fatal`; callers retry the first two only.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, StoreError>;
}

/// Read/write access to stored embedding vectors, addressed by opaque keys.
/// Eventually consistent reads are acceptable.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn put(&self, key: &str, vector: Embedding) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<Embedding>, StoreError>;
}

/// The opportunity catalog maintained by the crawler.
#[async_trait]
pub trait OpportunityCatalog: Send + Sync {
    /// Stream opportunities matching the filters. Large scans page
    /// internally; the stream yields items in catalog order.
    async fn scan(&self, filters: &OpportunityFilters) -> Result<OpportunityStream, StoreError>;
    async fn get(&self, notice_id: &str) -> Result<Option<Opportunity>, StoreError>;
}

/// Company profile lookups.
#[async_trait]
pub trait CompanyStore: Send + Sync {
    async fn get(&self, company_id: &str) -> Result<Option<CompanyProfile>, StoreError>;
}

/// Persisted match results, keyed by `(company_id, opportunity_id)`.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Idempotent single-row upsert.
    async fn put(&self, result: &MatchResult) -> Result<(), StoreError>;
    async fn get(
        &self,
        company_id: &str,
        opportunity_id: &str,
    ) -> Result<Option<MatchResult>, StoreError>;
    /// Top results for a company ordered by total score descending.
    async fn query(&self, company_id: &str, limit: usize) -> Result<Vec<MatchResult>, StoreError>;
    /// Bulk delete for a company; returns the number of rows removed.
    async fn delete_company(&self, company_id: &str) -> Result<usize, StoreError>;
}

/// A cached match result together with its storage timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedMatch {
    pub fingerprint: String,
    pub result: MatchResult,
    #[serde(with = "entities::timefmt")]
    pub cached_at: DateTime<Utc>,
}

/// TTL-aware fingerprint cache. Implementations may evict lazily; callers
/// must still check entry age.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, fingerprint: &str) -> Result<Option<CachedMatch>, StoreError>;
    async fn put(
        &self,
        fingerprint: &str,
        entry: CachedMatch,
        ttl: Duration,
    ) -> Result<(), StoreError>;
    /// Best-effort purge of all entries involving a company. Returns the
    /// number of entries removed.
    async fn invalidate_company(&self, company_id: &str) -> Result<usize, StoreError>;
}

/// One unit of batch work: a slice of an owner's candidate set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkItem {
    pub job_id: String,
    pub tenant_id: String,
    pub company_id: String,
    pub notice_ids: Vec<String>,
    #[serde(default)]
    pub force_refresh: bool,
}

/// A dequeued work item under a visibility lease.
#[derive(Debug, Clone)]
pub struct LeasedItem {
    pub lease_id: u64,
    /// 1 on first delivery; grows on each redelivery.
    pub delivery_count: u32,
    pub item: WorkItem,
}

/// Work queue between the coordinator and the match workers. Items become
/// invisible for the lease duration after dequeue and are redelivered unless
/// acked.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn enqueue(&self, item: WorkItem) -> Result<(), StoreError>;
    async fn dequeue(
        &self,
        max_items: usize,
        visibility: Duration,
    ) -> Result<Vec<LeasedItem>, StoreError>;
    /// Acknowledge successful processing; the item is gone for good.
    async fn ack(&self, lease_id: u64) -> Result<(), StoreError>;
    /// Return a leased item to the queue immediately.
    async fn nack(&self, lease_id: u64) -> Result<(), StoreError>;
    /// Visible depth (excludes leased items).
    async fn len(&self) -> Result<usize, StoreError>;
}

/// Key-value store for batch job records with conditional state transitions.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn upsert(&self, job: &BatchJob) -> Result<(), StoreError>;
    async fn get(&self, job_id: &str) -> Result<Option<BatchJob>, StoreError>;
    /// Compare-and-set state transition. Returns `false` when the current
    /// state did not match `from`.
    async fn transition(
        &self,
        job_id: &str,
        from: JobState,
        to: JobState,
    ) -> Result<bool, StoreError>;
    async fn list_owner(&self, tenant_id: &str) -> Result<Vec<BatchJob>, StoreError>;
}

/// Durable schedule entries.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn upsert(&self, entry: &ScheduleEntry) -> Result<(), StoreError>;
    async fn get(&self, name: &str) -> Result<Option<ScheduleEntry>, StoreError>;
    async fn delete(&self, name: &str) -> Result<bool, StoreError>;
    async fn list(&self) -> Result<Vec<ScheduleEntry>, StoreError>;
}

/// Tenant-level scoring weight overrides.
#[async_trait]
pub trait WeightStore: Send + Sync {
    async fn tenant_override(
        &self,
        tenant_id: &str,
    ) -> Result<Option<BTreeMap<String, f64>>, StoreError>;
}

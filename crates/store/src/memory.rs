//! In-process adapter implementations.
//!
//! These back the integration tests and the default server wiring. They honor
//! the full trait contracts (TTL expiry, visibility timeouts, delivery
//! counts, conditional transitions), so the batch layer behaves the same
//! against them as against managed backends.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};

use entities::{
    BatchJob, CompanyProfile, Embedding, JobState, MatchResult, Opportunity, OpportunityFilters,
    ScheduleEntry,
};

use crate::error::{StoreError, StoreErrorKind};
use crate::{
    CacheStore, CachedMatch, CompanyStore, EmbeddingService, JobStore, LeasedItem, MatchStore,
    OpportunityCatalog, OpportunityStream, ScheduleStore, VectorStore, WeightStore, WorkItem,
    WorkQueue,
};

/// Deterministic embedding service: derives a reproducible unit vector from a
/// digest of the input text. Useful wherever real embeddings are unnecessary
/// but vector geometry must be stable (identical text ⇒ identical vector).
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(entities::DEFAULT_EMBEDDING_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingService for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, StoreError> {
        let digest = Sha256::digest(text.as_bytes());
        let mut seed = 0u64;
        for (i, b) in digest.iter().take(8).enumerate() {
            seed |= (*b as u64) << (8 * i);
        }
        let mut v = vec![0f32; self.dimension];
        for (i, value) in v.iter_mut().enumerate() {
            let x = seed.wrapping_add((i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            *value = ((x >> 11) as f32 * 1e-7).sin();
        }
        let mut embedding = Embedding(v);
        embedding.normalize();
        Ok(embedding)
    }
}

/// In-memory vector store.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    vectors: DashMap<String, Embedding>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn put(&self, key: &str, vector: Embedding) -> Result<(), StoreError> {
        self.vectors.insert(key.to_string(), vector);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Embedding>, StoreError> {
        Ok(self.vectors.get(key).map(|v| v.clone()))
    }
}

/// In-memory opportunity catalog.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    opportunities: DashMap<String, Opportunity>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, opp: Opportunity) {
        self.opportunities.insert(opp.notice_id.clone(), opp);
    }

    pub fn len(&self) -> usize {
        self.opportunities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }
}

#[async_trait]
impl OpportunityCatalog for MemoryCatalog {
    async fn scan(&self, filters: &OpportunityFilters) -> Result<OpportunityStream, StoreError> {
        let today = Utc::now().date_naive();
        let mut items: Vec<Opportunity> = self
            .opportunities
            .iter()
            .filter(|entry| filters.matches(entry.value(), today))
            .map(|entry| entry.value().clone())
            .collect();
        // Catalog order: stable by notice id.
        items.sort_by(|a, b| a.notice_id.cmp(&b.notice_id));
        Ok(stream::iter(items.into_iter().map(Ok)).boxed())
    }

    async fn get(&self, notice_id: &str) -> Result<Option<Opportunity>, StoreError> {
        Ok(self.opportunities.get(notice_id).map(|o| o.clone()))
    }
}

/// In-memory company profile store.
#[derive(Debug, Default)]
pub struct MemoryCompanyStore {
    companies: DashMap<String, CompanyProfile>,
}

impl MemoryCompanyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: CompanyProfile) {
        self.companies.insert(profile.company_id.clone(), profile);
    }
}

#[async_trait]
impl CompanyStore for MemoryCompanyStore {
    async fn get(&self, company_id: &str) -> Result<Option<CompanyProfile>, StoreError> {
        Ok(self.companies.get(company_id).map(|p| p.clone()))
    }
}

/// In-memory match result store with lazy TTL expiry on reads.
#[derive(Debug, Default)]
pub struct MemoryMatchStore {
    results: DashMap<(String, String), MatchResult>,
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[async_trait]
impl MatchStore for MemoryMatchStore {
    async fn put(&self, result: &MatchResult) -> Result<(), StoreError> {
        self.results.insert(
            (result.company_id.clone(), result.opportunity_id.clone()),
            result.clone(),
        );
        Ok(())
    }

    async fn get(
        &self,
        company_id: &str,
        opportunity_id: &str,
    ) -> Result<Option<MatchResult>, StoreError> {
        let now = Utc::now();
        let key = (company_id.to_string(), opportunity_id.to_string());
        Ok(self
            .results
            .get(&key)
            .filter(|r| r.expires_at > now)
            .map(|r| r.clone()))
    }

    async fn query(&self, company_id: &str, limit: usize) -> Result<Vec<MatchResult>, StoreError> {
        let now = Utc::now();
        let mut matches: Vec<MatchResult> = self
            .results
            .iter()
            .filter(|entry| entry.key().0 == company_id && entry.value().expires_at > now)
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by(|a, b| {
            b.total_score
                .partial_cmp(&a.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.opportunity_id.cmp(&b.opportunity_id))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    async fn delete_company(&self, company_id: &str) -> Result<usize, StoreError> {
        let before = self.results.len();
        self.results.retain(|key, _| key.0 != company_id);
        Ok(before - self.results.len())
    }
}

#[derive(Debug, Clone)]
struct CacheSlot {
    entry: CachedMatch,
    expires_at: Instant,
}

/// In-memory fingerprint cache with native TTL eviction on access.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheSlot>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, fingerprint: &str) -> Result<Option<CachedMatch>, StoreError> {
        let expired = match self.entries.get(fingerprint) {
            Some(slot) if slot.expires_at > Instant::now() => {
                return Ok(Some(slot.entry.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(fingerprint);
        }
        Ok(None)
    }

    async fn put(
        &self,
        fingerprint: &str,
        entry: CachedMatch,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.entries.insert(
            fingerprint.to_string(),
            CacheSlot {
                entry,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn invalidate_company(&self, company_id: &str) -> Result<usize, StoreError> {
        let before = self.entries.len();
        self.entries
            .retain(|_, slot| slot.entry.result.company_id != company_id);
        Ok(before - self.entries.len())
    }
}

#[derive(Debug)]
struct LeasedEntry {
    item: WorkItem,
    delivery_count: u32,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<(WorkItem, u32)>,
    leased: HashMap<u64, LeasedEntry>,
}

/// In-memory work queue with visibility timeouts and delivery counts.
#[derive(Debug, Default)]
pub struct MemoryWorkQueue {
    state: Mutex<QueueState>,
    next_lease: AtomicU64,
}

impl MemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn reclaim_expired(state: &mut QueueState, now: Instant) {
        let expired: Vec<u64> = state
            .leased
            .iter()
            .filter(|(_, lease)| lease.expires_at <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            if let Some(lease) = state.leased.remove(&id) {
                state.ready.push_back((lease.item, lease.delivery_count));
            }
        }
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    async fn enqueue(&self, item: WorkItem) -> Result<(), StoreError> {
        self.lock().ready.push_back((item, 0));
        Ok(())
    }

    async fn dequeue(
        &self,
        max_items: usize,
        visibility: Duration,
    ) -> Result<Vec<LeasedItem>, StoreError> {
        let now = Instant::now();
        let mut state = self.lock();
        Self::reclaim_expired(&mut state, now);

        let mut leased = Vec::new();
        while leased.len() < max_items {
            let Some((item, prior_deliveries)) = state.ready.pop_front() else {
                break;
            };
            let lease_id = self.next_lease.fetch_add(1, Ordering::Relaxed);
            let delivery_count = prior_deliveries + 1;
            state.leased.insert(
                lease_id,
                LeasedEntry {
                    item: item.clone(),
                    delivery_count,
                    expires_at: now + visibility,
                },
            );
            leased.push(LeasedItem {
                lease_id,
                delivery_count,
                item,
            });
        }
        Ok(leased)
    }

    async fn ack(&self, lease_id: u64) -> Result<(), StoreError> {
        // A missing lease means the visibility window expired and the item was
        // reclaimed; acking it then is a no-op rather than an error.
        self.lock().leased.remove(&lease_id);
        Ok(())
    }

    async fn nack(&self, lease_id: u64) -> Result<(), StoreError> {
        let mut state = self.lock();
        if let Some(lease) = state.leased.remove(&lease_id) {
            state.ready.push_back((lease.item, lease.delivery_count));
        }
        Ok(())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock().ready.len())
    }
}

/// In-memory batch job store with compare-and-set transitions.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: DashMap<String, BatchJob>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn upsert(&self, job: &BatchJob) -> Result<(), StoreError> {
        self.jobs.insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<BatchJob>, StoreError> {
        Ok(self.jobs.get(job_id).map(|j| j.clone()))
    }

    async fn transition(
        &self,
        job_id: &str,
        from: JobState,
        to: JobState,
    ) -> Result<bool, StoreError> {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::new(StoreErrorKind::NotFound, format!("job {job_id}")))?;
        if job.state != from {
            return Ok(false);
        }
        job.state = to;
        Ok(true)
    }

    async fn list_owner(&self, tenant_id: &str) -> Result<Vec<BatchJob>, StoreError> {
        let mut jobs: Vec<BatchJob> = self
            .jobs
            .iter()
            .filter(|entry| entry.value().owner.tenant_id == tenant_id)
            .map(|entry| entry.value().clone())
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }
}

/// In-memory schedule store.
#[derive(Debug, Default)]
pub struct MemoryScheduleStore {
    entries: DashMap<String, ScheduleEntry>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn upsert(&self, entry: &ScheduleEntry) -> Result<(), StoreError> {
        self.entries.insert(entry.name.clone(), entry.clone());
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<ScheduleEntry>, StoreError> {
        Ok(self.entries.get(name).map(|e| e.clone()))
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.entries.remove(name).is_some())
    }

    async fn list(&self) -> Result<Vec<ScheduleEntry>, StoreError> {
        let mut entries: Vec<ScheduleEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// In-memory weight override store.
#[derive(Debug, Default)]
pub struct MemoryWeightStore {
    overrides: DashMap<String, BTreeMap<String, f64>>,
}

impl MemoryWeightStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_override(&self, tenant_id: &str, weights: BTreeMap<String, f64>) {
        self.overrides.insert(tenant_id.to_string(), weights);
    }

    pub fn clear_override(&self, tenant_id: &str) {
        self.overrides.remove(tenant_id);
    }
}

#[async_trait]
impl WeightStore for MemoryWeightStore {
    async fn tenant_override(
        &self,
        tenant_id: &str,
    ) -> Result<Option<BTreeMap<String, f64>>, StoreError> {
        Ok(self.overrides.get(tenant_id).map(|w| w.clone()))
    }
}

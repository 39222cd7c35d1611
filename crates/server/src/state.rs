use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use metrics_exporter_prometheus::PrometheusHandle;

use batch::{
    BatchCoordinator, BatchOptimizer, MatchWorker, ProgressTracker, ScheduleManager, WorkerConfig,
};
use engine::{MatchEngine, ResultCache};
use filter::QuickFilter;
use scoring::{ScorerRegistry, ScoringConfig, ScoringContext, WeightResolver};
use store::memory::{
    HashEmbedder, MemoryCacheStore, MemoryCatalog, MemoryCompanyStore, MemoryJobStore,
    MemoryMatchStore, MemoryScheduleStore, MemoryVectorStore, MemoryWeightStore, MemoryWorkQueue,
};
use store::{
    CompanyStore, JobStore, MatchStore, OpportunityCatalog, ScheduleStore, VectorStore, WorkQueue,
};

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Shared application state
///
/// The default wiring binds every adapter to its in-memory implementation;
/// production deployments swap these for managed backends behind the same
/// trait objects.
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: API key -> (count, window_start)
    pub rate_limiter: DashMap<String, (u32, std::time::Instant)>,

    /// Catalog and profile stores (shared with background workers)
    pub catalog: Arc<MemoryCatalog>,
    pub companies: Arc<MemoryCompanyStore>,
    pub vectors: Arc<MemoryVectorStore>,
    pub matches: Arc<dyn MatchStore>,

    /// Match engine (shared across requests)
    pub engine: Arc<MatchEngine>,

    /// Batch coordination
    pub coordinator: BatchCoordinator,
    pub schedules: Arc<ScheduleManager>,

    /// Prometheus render handle when metrics are enabled
    pub metrics_handle: Option<PrometheusHandle>,

    shutdown: Arc<AtomicBool>,
}

impl ServerState {
    /// Create new server state and spawn the background workers and the
    /// schedule tick loop.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let catalog = Arc::new(MemoryCatalog::new());
        let companies = Arc::new(MemoryCompanyStore::new());
        let vectors = Arc::new(MemoryVectorStore::new());
        let matches: Arc<dyn MatchStore> = Arc::new(MemoryMatchStore::new());
        let queue: Arc<dyn WorkQueue> = Arc::new(MemoryWorkQueue::new());
        let jobs: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
        let schedule_store: Arc<dyn ScheduleStore> = Arc::new(MemoryScheduleStore::new());
        let tracker = Arc::new(ProgressTracker::new());
        let optimizer = Arc::new(BatchOptimizer::default());

        let engine_config = config.engine.clone();
        let registry = ScorerRegistry::standard();
        let weights = Arc::new(WeightResolver::new(
            Arc::new(MemoryWeightStore::new()),
            registry.default_weights(),
        ));
        let cache = ResultCache::new(
            Arc::new(MemoryCacheStore::new()),
            engine_config.cache_ttl(),
        );
        let context = ScoringContext::new(
            Arc::clone(&vectors) as Arc<dyn VectorStore>,
            Some(Arc::new(HashEmbedder::default())),
            ScoringConfig::default(),
        );
        let engine = Arc::new(MatchEngine::new(
            QuickFilter::default(),
            registry,
            weights,
            cache,
            context,
            engine_config,
        )?);

        let coordinator = BatchCoordinator::new(
            Arc::clone(&catalog) as Arc<dyn OpportunityCatalog>,
            Arc::clone(&companies) as Arc<dyn CompanyStore>,
            Arc::clone(&matches),
            Arc::clone(&queue),
            Arc::clone(&jobs),
            Arc::clone(&tracker),
            Arc::clone(&optimizer),
            config.batch.clone(),
        );
        let schedules = Arc::new(ScheduleManager::new(schedule_store, coordinator.clone()));

        let shutdown = Arc::new(AtomicBool::new(false));
        for worker_index in 0..config.worker_count.max(1) {
            let worker = MatchWorker::new(
                Arc::clone(&engine),
                Arc::clone(&queue),
                Arc::clone(&catalog) as Arc<dyn OpportunityCatalog>,
                Arc::clone(&companies) as Arc<dyn CompanyStore>,
                Arc::clone(&matches),
                Arc::clone(&jobs),
                coordinator.clone(),
                WorkerConfig::default(),
            );
            let flag = Arc::clone(&shutdown);
            tokio::spawn(async move {
                tracing::debug!(worker_index, "match worker started");
                worker.run(flag).await;
            });
        }

        let tick = config.schedule_tick().max(Duration::from_secs(1));
        let schedule_loop = Arc::clone(&schedules);
        let schedule_shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            schedule_loop.run_loop(tick, schedule_shutdown).await;
        });

        Ok(Self {
            config: Arc::new(config),
            rate_limiter: DashMap::new(),
            catalog,
            companies,
            vectors,
            matches,
            engine,
            coordinator,
            schedules,
            metrics_handle: None,
            shutdown,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Stop background workers and the schedule loop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if API key is valid
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        self.config.api_keys.contains(key)
    }

    /// Check rate limit for API key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = std::time::Instant::now();
        let window = std::time::Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        // Reset if window has passed
        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        // Check limit
        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }
}

//! Umbrella crate for the GovMatch matching engine.
//!
//! The `govmatch` crate re-exports the entity model, quick filter, scoring
//! components, match orchestrator, external adapter seams, and batch layer so
//! applications can drive the full pipeline through a single dependency.
//! [`build_memory_stack`] assembles a complete in-process deployment for
//! demos and tests, and [`evaluate_with_observer`] wraps evaluations with the
//! optional process-wide [`MatchObserver`] hook.
//!
//! ## Quick start
//!
//! ```ignore
//! use govmatch::{build_memory_stack, GovMatchConfig, MatchRequest};
//!
//! # async fn demo(opportunity: govmatch::Opportunity, company: govmatch::CompanyProfile)
//! # -> Result<(), govmatch::EngineError> {
//! let stack = build_memory_stack(&GovMatchConfig::default())?;
//! let result = stack
//!     .engine
//!     .evaluate(&MatchRequest::new(opportunity, company))
//!     .await?;
//! println!("{} -> {:?}", result.total_score, result.confidence_level);
//! # Ok(())
//! # }
//! ```
//!
//! ## Observability
//!
//! Install a [`MatchObserver`] with [`set_match_observer`] to receive one
//! [`MatchEvent`] per evaluation routed through [`evaluate_with_observer`].
//! The hook is process-wide and intended for request-level telemetry that the
//! `metrics` facade counters do not capture.

pub mod config;

pub use config::{ConfigLoadError, GovMatchConfig};

pub use entities::{
    BatchJob, CompanyProfile, ComponentScore, ConfidenceLevel, Embedding, EntityError,
    JobCounters, JobState, Location, MatchOutcomeStatus, MatchResult, Opportunity,
    OpportunityFilters, PastPerformanceRecord, PlaceOfPerformance, ScheduleEntry, ScheduleSpec,
    SetAsideClass,
};
pub use filter::{CapacityThresholds, FilterReport, QuickFilter, QuickFilterConfig};
pub use scoring::{
    ComponentResult, ComponentScorer, ComponentWeights, ScoreError, ScorerRegistry, ScoringConfig,
    ScoringContext, WeightResolver,
};
pub use engine::{
    fingerprint, EngineConfig, EngineError, MatchEngine, MatchRequest, ResultCache,
};
pub use batch::{
    BatchConfig, BatchCoordinator, BatchError, BatchOptimizer, BatchRequest, JobStatus,
    MatchWorker, ProgressTracker, ScheduleManager, TrackerStatus, WorkerConfig,
};
pub use store::{StoreError, StoreErrorKind};

use std::sync::{Arc, OnceLock, RwLock};

use store::memory::{
    HashEmbedder, MemoryCacheStore, MemoryCatalog, MemoryCompanyStore, MemoryJobStore,
    MemoryMatchStore, MemoryScheduleStore, MemoryVectorStore, MemoryWeightStore, MemoryWorkQueue,
};
use store::{
    CompanyStore, JobStore, MatchStore, OpportunityCatalog, ScheduleStore, VectorStore, WorkQueue,
};

/// One evaluation outcome delivered to the observer hook.
#[derive(Debug, Clone)]
pub struct MatchEvent {
    pub company_id: String,
    pub opportunity_id: String,
    pub total_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub status: MatchOutcomeStatus,
    pub cached: bool,
    pub processing_time_ms: f64,
}

impl MatchEvent {
    fn from_result(result: &MatchResult) -> Self {
        Self {
            company_id: result.company_id.clone(),
            opportunity_id: result.opportunity_id.clone(),
            total_score: result.total_score,
            confidence_level: result.confidence_level,
            status: result.status,
            cached: result.cached,
            processing_time_ms: result.processing_time_ms,
        }
    }
}

/// Hook receiving one event per observed evaluation.
pub trait MatchObserver: Send + Sync {
    fn observe(&self, event: &MatchEvent);
}

fn observer_lock() -> &'static RwLock<Option<Arc<dyn MatchObserver>>> {
    static OBSERVER: OnceLock<RwLock<Option<Arc<dyn MatchObserver>>>> = OnceLock::new();
    OBSERVER.get_or_init(|| RwLock::new(None))
}

/// Install or clear the process-wide match observer.
pub fn set_match_observer(observer: Option<Arc<dyn MatchObserver>>) {
    let mut guard = observer_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = observer;
}

fn match_observer() -> Option<Arc<dyn MatchObserver>> {
    observer_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Evaluate a request and notify the installed observer, if any.
pub async fn evaluate_with_observer(
    engine: &MatchEngine,
    request: &MatchRequest,
) -> Result<MatchResult, EngineError> {
    let result = engine.evaluate(request).await?;
    if let Some(observer) = match_observer() {
        observer.observe(&MatchEvent::from_result(&result));
    }
    Ok(result)
}

/// A complete in-process deployment over the memory adapters.
pub struct MemoryStack {
    pub catalog: Arc<MemoryCatalog>,
    pub companies: Arc<MemoryCompanyStore>,
    pub vectors: Arc<MemoryVectorStore>,
    pub matches: Arc<MemoryMatchStore>,
    pub queue: Arc<MemoryWorkQueue>,
    pub jobs: Arc<MemoryJobStore>,
    pub schedules: Arc<MemoryScheduleStore>,
    pub weight_store: Arc<MemoryWeightStore>,
    pub tracker: Arc<ProgressTracker>,
    pub optimizer: Arc<BatchOptimizer>,
    pub engine: Arc<MatchEngine>,
    pub coordinator: BatchCoordinator,
    pub schedule_manager: Arc<ScheduleManager>,
}

impl MemoryStack {
    /// Construct a worker bound to this stack's queue and engine.
    pub fn worker(&self, config: WorkerConfig) -> MatchWorker {
        MatchWorker::new(
            Arc::clone(&self.engine),
            Arc::clone(&self.queue) as Arc<dyn WorkQueue>,
            Arc::clone(&self.catalog) as Arc<dyn OpportunityCatalog>,
            Arc::clone(&self.companies) as Arc<dyn CompanyStore>,
            Arc::clone(&self.matches) as Arc<dyn MatchStore>,
            Arc::clone(&self.jobs) as Arc<dyn JobStore>,
            self.coordinator.clone(),
            config,
        )
    }
}

/// Assemble the full pipeline over in-memory adapters.
///
/// Production deployments construct [`MatchEngine`], [`BatchCoordinator`],
/// and [`MatchWorker`] directly against their own adapter implementations;
/// this constructor exists for demos, tests, and single-process evaluation.
pub fn build_memory_stack(config: &GovMatchConfig) -> Result<MemoryStack, EngineError> {
    let catalog = Arc::new(MemoryCatalog::new());
    let companies = Arc::new(MemoryCompanyStore::new());
    let vectors = Arc::new(MemoryVectorStore::new());
    let matches = Arc::new(MemoryMatchStore::new());
    let queue = Arc::new(MemoryWorkQueue::new());
    let jobs = Arc::new(MemoryJobStore::new());
    let schedules = Arc::new(MemoryScheduleStore::new());
    let weight_store = Arc::new(MemoryWeightStore::new());
    let tracker = Arc::new(ProgressTracker::new());
    let optimizer = Arc::new(BatchOptimizer::new(config.optimizer.clone()));

    let registry = ScorerRegistry::standard();
    let mut defaults = registry.default_weights();
    if let Some(overrides) = &config.default_weights {
        defaults = defaults.with_overrides(overrides);
    }
    let resolver = Arc::new(WeightResolver::new(
        Arc::clone(&weight_store) as Arc<dyn store::WeightStore>,
        defaults,
    ));

    let cache = ResultCache::new(
        Arc::new(MemoryCacheStore::new()),
        config.engine.cache_ttl(),
    );
    let context = ScoringContext::new(
        Arc::clone(&vectors) as Arc<dyn VectorStore>,
        Some(Arc::new(HashEmbedder::new(config.scoring.embedding_dimension))),
        config.scoring.clone(),
    );
    let engine = Arc::new(MatchEngine::new(
        QuickFilter::new(config.quick_filter.clone()),
        registry,
        resolver,
        cache,
        context,
        config.engine.clone(),
    )?);

    let coordinator = BatchCoordinator::new(
        Arc::clone(&catalog) as Arc<dyn OpportunityCatalog>,
        Arc::clone(&companies) as Arc<dyn CompanyStore>,
        Arc::clone(&matches) as Arc<dyn MatchStore>,
        Arc::clone(&queue) as Arc<dyn WorkQueue>,
        Arc::clone(&jobs) as Arc<dyn JobStore>,
        Arc::clone(&tracker),
        Arc::clone(&optimizer),
        config.batch.clone(),
    );
    let schedule_manager = Arc::new(ScheduleManager::new(
        Arc::clone(&schedules) as Arc<dyn ScheduleStore>,
        coordinator.clone(),
    ));

    Ok(MemoryStack {
        catalog,
        companies,
        vectors,
        matches,
        queue,
        jobs,
        schedules,
        weight_store,
        tracker,
        optimizer,
        engine,
        coordinator,
        schedule_manager,
    })
}

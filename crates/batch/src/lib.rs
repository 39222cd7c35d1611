//! Batch orchestration for GovMatch.
//!
//! The coordinator turns a batch request into a job: it resolves the
//! candidate set from the catalog, partitions it into work units, and
//! enqueues them with back-pressure. Workers lease units from the shared
//! queue, evaluate items through the match engine with bounded retries, and
//! report progress to the tracker. The optimizer adapts batch size and
//! concurrency from completed waves, and the schedule manager fires stored
//! batch requests on cron or one-shot triggers.

pub mod coordinator;
pub mod optimizer;
pub mod schedule;
pub mod tracker;
pub mod types;
pub mod worker;

pub use coordinator::{BatchCoordinator, JobStatus};
pub use optimizer::{BatchOptimizer, BatchTuning, OptimizationDecision, OptimizerConfig, WaveStats};
pub use schedule::ScheduleManager;
pub use tracker::{CounterDelta, JobHealth, ProgressTracker, TrackerStatus};
pub use types::{
    BatchConfig, BatchError, BatchRequest, WorkerConfig, BATCH_SIZE_MAX, BATCH_SIZE_MIN,
    CONCURRENCY_MAX, CONCURRENCY_MIN,
};
pub use worker::MatchWorker;

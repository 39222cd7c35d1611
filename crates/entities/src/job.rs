//! Batch job records and counter bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filters::OpportunityFilters;

/// Lifecycle of a batch job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

/// Item counters for a job. `submitted` must always equal
/// `succeeded + failed + skipped + in_flight`; succeeded/failed/skipped are
/// monotonic, only `in_flight` may decrease.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobCounters {
    /// Candidate items discovered for the job.
    pub total: u64,
    /// Items handed to workers so far.
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub in_flight: u64,
}

impl JobCounters {
    pub fn consistent(&self) -> bool {
        self.submitted == self.succeeded + self.failed + self.skipped + self.in_flight
    }

    /// Items that have reached a terminal per-item outcome.
    pub fn settled(&self) -> u64 {
        self.succeeded + self.failed + self.skipped
    }

    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.settled())
    }

    /// Failure rate over submitted items; 0 when nothing was submitted.
    pub fn failure_rate(&self) -> f64 {
        if self.submitted == 0 {
            0.0
        } else {
            self.failed as f64 / self.submitted as f64
        }
    }
}

/// Who a job belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobOwner {
    pub tenant_id: String,
    pub company_id: String,
}

/// Frozen configuration a job was launched with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchJobConfig {
    pub batch_size: usize,
    pub concurrency: usize,
    #[serde(default)]
    pub filters: OpportunityFilters,
    #[serde(default)]
    pub force_refresh: bool,
}

/// Optimizer observation attached to the job record for auditability.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct OptimizerSnapshot {
    pub batch_size: usize,
    pub concurrency: usize,
    pub observed_throughput: f64,
    pub observed_failure_rate: f64,
}

/// Persistent record of one batch scoring run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchJob {
    pub job_id: String,
    pub owner: JobOwner,
    pub state: JobState,
    pub counters: JobCounters,
    pub config: BatchJobConfig,
    #[serde(default)]
    pub optimizer_snapshot: Option<OptimizerSnapshot>,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(with = "crate::timefmt")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "crate::timefmt::option")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timefmt::option")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    pub fn new(job_id: String, owner: JobOwner, config: BatchJobConfig) -> Self {
        Self {
            job_id,
            owner,
            state: JobState::Pending,
            counters: JobCounters::default(),
            config,
            optimizer_snapshot: None,
            last_error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }
}

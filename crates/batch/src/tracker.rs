//! Per-job progress accounting.
//!
//! Counters are monotonic (only `in_flight` may decrease) and always satisfy
//! `submitted = succeeded + failed + skipped + in_flight`. The tracker also
//! keeps trailing windows for throughput and failure-rate health checks, and
//! publishes metric samples for external observability.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Notify;

use entities::{JobCounters, JobState};

use crate::types::BatchError;

/// Throughput window for ETA computation.
const THROUGHPUT_WINDOW: Duration = Duration::from_secs(60);
/// Trailing item-outcome window for failure-rate health.
const HEALTH_OUTCOME_WINDOW: usize = 100;
/// A RUNNING job with no progress for this long is unhealthy.
const STALL_LIMIT: Duration = Duration::from_secs(120);

/// Atomic counter adjustment. All fields add; `in_flight` is the only signed
/// one, because items leave flight when they settle.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterDelta {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub in_flight: i64,
}

impl CounterDelta {
    pub fn submitted(n: u64) -> Self {
        Self {
            submitted: n,
            ..Default::default()
        }
    }

    pub fn item_started() -> Self {
        Self {
            in_flight: 1,
            ..Default::default()
        }
    }

    pub fn item_succeeded() -> Self {
        Self {
            succeeded: 1,
            in_flight: -1,
            ..Default::default()
        }
    }

    pub fn item_failed() -> Self {
        Self {
            failed: 1,
            in_flight: -1,
            ..Default::default()
        }
    }

    pub fn item_skipped() -> Self {
        Self {
            skipped: 1,
            in_flight: -1,
            ..Default::default()
        }
    }

    /// A skip recorded without the item ever entering flight (cancelled jobs).
    pub fn skipped_without_flight(n: u64) -> Self {
        Self {
            skipped: n,
            ..Default::default()
        }
    }

    fn settles_items(&self) -> u64 {
        self.succeeded + self.failed + self.skipped
    }
}

#[derive(Debug)]
struct JobProgress {
    state: JobState,
    counters: JobCounters,
    completions: VecDeque<Instant>,
    outcomes: VecDeque<bool>, // true = failed
    last_progress: Instant,
}

impl JobProgress {
    fn new(total: u64) -> Self {
        Self {
            state: JobState::Pending,
            counters: JobCounters {
                total,
                ..Default::default()
            },
            completions: VecDeque::new(),
            outcomes: VecDeque::new(),
            last_progress: Instant::now(),
        }
    }

    fn throughput_per_sec(&self, now: Instant) -> f64 {
        let recent = self
            .completions
            .iter()
            .filter(|at| now.duration_since(**at) < THROUGHPUT_WINDOW)
            .count();
        recent as f64 / THROUGHPUT_WINDOW.as_secs_f64()
    }

    fn trailing_failure_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        let failed = self.outcomes.iter().filter(|f| **f).count();
        failed as f64 / self.outcomes.len() as f64
    }
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerStatus {
    pub state: JobState,
    pub counters: JobCounters,
    /// Items settled per second over the trailing window.
    pub throughput_per_sec: f64,
    /// Estimated seconds to drain the remaining items; `None` while idle.
    pub eta_seconds: Option<f64>,
}

/// Health verdict for a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobHealth {
    pub ok: bool,
    pub reasons: Vec<String>,
}

/// In-process progress tracker shared by the coordinator and workers.
#[derive(Default)]
pub struct ProgressTracker {
    jobs: DashMap<String, JobProgress>,
    progress: Notify,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job before any counter updates.
    pub fn register(&self, job_id: &str, total: u64) {
        self.jobs.insert(job_id.to_string(), JobProgress::new(total));
    }

    pub fn set_state(&self, job_id: &str, state: JobState) {
        if let Some(mut progress) = self.jobs.get_mut(job_id) {
            progress.state = state;
            progress.last_progress = Instant::now();
        }
        self.progress.notify_waiters();
    }

    /// Apply a counter delta. Monotonic counters reject decreases by
    /// construction (fields are unsigned); an `in_flight` decrement below
    /// zero indicates double accounting and is rejected.
    pub fn update(&self, job_id: &str, delta: CounterDelta) -> Result<JobCounters, BatchError> {
        let mut progress = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| BatchError::JobNotFound(job_id.to_string()))?;

        let new_in_flight = progress.counters.in_flight as i64 + delta.in_flight;
        if new_in_flight < 0 {
            return Err(BatchError::NegativeDelta);
        }

        progress.counters.submitted += delta.submitted;
        progress.counters.succeeded += delta.succeeded;
        progress.counters.failed += delta.failed;
        progress.counters.skipped += delta.skipped;
        progress.counters.in_flight = new_in_flight as u64;

        let settled = delta.settles_items();
        if settled > 0 {
            let now = Instant::now();
            for _ in 0..settled {
                progress.completions.push_back(now);
            }
            while progress.completions.len() > 10 * HEALTH_OUTCOME_WINDOW {
                progress.completions.pop_front();
            }
            for _ in 0..delta.succeeded + delta.skipped {
                progress.outcomes.push_back(false);
            }
            for _ in 0..delta.failed {
                progress.outcomes.push_back(true);
            }
            while progress.outcomes.len() > HEALTH_OUTCOME_WINDOW {
                progress.outcomes.pop_front();
            }
        }
        progress.last_progress = Instant::now();

        let counters = progress.counters;
        drop(progress);
        self.progress.notify_waiters();
        Ok(counters)
    }

    pub fn counters(&self, job_id: &str) -> Option<JobCounters> {
        self.jobs.get(job_id).map(|p| p.counters)
    }

    pub fn state(&self, job_id: &str) -> Option<JobState> {
        self.jobs.get(job_id).map(|p| p.state)
    }

    pub fn status(&self, job_id: &str) -> Option<TrackerStatus> {
        let progress = self.jobs.get(job_id)?;
        let now = Instant::now();
        let throughput = progress.throughput_per_sec(now);
        let remaining = progress.counters.remaining();
        let eta_seconds = if throughput > 0.0 && remaining > 0 {
            Some(remaining as f64 / throughput)
        } else {
            None
        };
        Some(TrackerStatus {
            state: progress.state,
            counters: progress.counters,
            throughput_per_sec: throughput,
            eta_seconds,
        })
    }

    pub fn health(&self, job_id: &str) -> Option<JobHealth> {
        let progress = self.jobs.get(job_id)?;
        let mut reasons = Vec::new();

        if progress.state == JobState::Running
            && progress.counters.remaining() > 0
            && progress.last_progress.elapsed() > STALL_LIMIT
        {
            reasons.push(format!(
                "no progress for {}s while running",
                progress.last_progress.elapsed().as_secs()
            ));
        }
        let failure_rate = progress.trailing_failure_rate();
        if failure_rate > 0.25 {
            reasons.push(format!(
                "failure rate {failure_rate:.2} over the last {} items",
                progress.outcomes.len()
            ));
        }

        Some(JobHealth {
            ok: reasons.is_empty(),
            reasons,
        })
    }

    /// Publish metric samples for a job. External observability scrapes these
    /// through the process metrics exporter.
    pub fn publish(&self, job_id: &str) {
        let Some(status) = self.status(job_id) else {
            return;
        };
        let id = job_id.to_string();
        metrics::gauge!("govmatch_job_submitted", "job_id" => id.clone())
            .set(status.counters.submitted as f64);
        metrics::gauge!("govmatch_job_succeeded", "job_id" => id.clone())
            .set(status.counters.succeeded as f64);
        metrics::gauge!("govmatch_job_failed", "job_id" => id.clone())
            .set(status.counters.failed as f64);
        metrics::gauge!("govmatch_job_skipped", "job_id" => id.clone())
            .set(status.counters.skipped as f64);
        metrics::gauge!("govmatch_job_in_flight", "job_id" => id.clone())
            .set(status.counters.in_flight as f64);
        metrics::gauge!("govmatch_job_throughput", "job_id" => id)
            .set(status.throughput_per_sec);
    }

    /// Wait (bounded) for the next counter movement. Used by the coordinator
    /// for enqueue back-pressure.
    pub async fn wait_progress(&self, limit: Duration) {
        let _ = tokio::time::timeout(limit, self.progress.notified()).await;
    }
}

//! Batch job coordination.
//!
//! `submit` resolves the candidate set, creates the job record, and hands the
//! enqueue loop to a background task so the caller gets a job id immediately.
//! Dispatch respects an in-flight ceiling by waiting on tracker progress;
//! workers drive per-item completion and call back into
//! [`BatchCoordinator::try_complete`] after every unit.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use entities::{
    BatchJob, BatchJobConfig, JobCounters, JobOwner, JobState, OptimizerSnapshot,
};
use store::{CompanyStore, JobStore, MatchStore, OpportunityCatalog, WorkItem, WorkQueue};

use crate::optimizer::{BatchOptimizer, WaveStats};
use crate::tracker::{CounterDelta, JobHealth, ProgressTracker, TrackerStatus};
use crate::types::{BatchConfig, BatchError, BatchRequest, BATCH_SIZE_MAX, BATCH_SIZE_MIN};

/// Combined job view served to status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub job: BatchJob,
    pub throughput_per_sec: f64,
    pub eta_seconds: Option<f64>,
}

/// Coordinates candidate resolution, work dispatch, and job completion.
#[derive(Clone)]
pub struct BatchCoordinator {
    catalog: Arc<dyn OpportunityCatalog>,
    companies: Arc<dyn CompanyStore>,
    matches: Arc<dyn MatchStore>,
    queue: Arc<dyn WorkQueue>,
    jobs: Arc<dyn JobStore>,
    tracker: Arc<ProgressTracker>,
    optimizer: Arc<BatchOptimizer>,
    config: BatchConfig,
}

impl BatchCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<dyn OpportunityCatalog>,
        companies: Arc<dyn CompanyStore>,
        matches: Arc<dyn MatchStore>,
        queue: Arc<dyn WorkQueue>,
        jobs: Arc<dyn JobStore>,
        tracker: Arc<ProgressTracker>,
        optimizer: Arc<BatchOptimizer>,
        config: BatchConfig,
    ) -> Self {
        Self {
            catalog,
            companies,
            matches,
            queue,
            jobs,
            tracker,
            optimizer,
            config,
        }
    }

    pub fn tracker(&self) -> &Arc<ProgressTracker> {
        &self.tracker
    }

    pub fn optimizer(&self) -> &Arc<BatchOptimizer> {
        &self.optimizer
    }

    /// Create and start a batch job. Returns the job id once the candidate
    /// set is resolved; enqueueing proceeds in the background.
    pub async fn submit(&self, request: BatchRequest) -> Result<String, BatchError> {
        request.validate()?;
        if self.companies.get(&request.company_id).await?.is_none() {
            return Err(BatchError::CompanyNotFound(request.company_id));
        }

        let tuning = self.optimizer.current(&request.tenant_id);
        let batch_size = request
            .batch_size
            .unwrap_or(tuning.batch_size)
            .clamp(BATCH_SIZE_MIN, BATCH_SIZE_MAX);

        // Resolve the candidate set. Archived opportunities are excluded by
        // the default filter semantics unless the request opts in.
        let mut candidates = Vec::new();
        let mut scan = self.catalog.scan(&request.filters).await?;
        while let Some(item) = scan.next().await {
            candidates.push(item?.notice_id);
        }

        if request.force_refresh {
            let deleted = self.matches.delete_company(&request.company_id).await?;
            info!(company = %request.company_id, deleted, "cleared prior results for refresh");
        }

        let job_id = Uuid::new_v4().to_string();
        let mut job = BatchJob::new(
            job_id.clone(),
            JobOwner {
                tenant_id: request.tenant_id.clone(),
                company_id: request.company_id.clone(),
            },
            BatchJobConfig {
                batch_size,
                concurrency: tuning.concurrency,
                filters: request.filters.clone(),
                force_refresh: request.force_refresh,
            },
        );
        job.counters.total = candidates.len() as u64;
        job.optimizer_snapshot = Some(OptimizerSnapshot {
            batch_size: tuning.batch_size,
            concurrency: tuning.concurrency,
            observed_throughput: 0.0,
            observed_failure_rate: 0.0,
        });
        self.jobs.upsert(&job).await?;
        self.tracker.register(&job_id, job.counters.total);

        info!(
            job_id = %job_id,
            company = %request.company_id,
            candidates = candidates.len(),
            batch_size,
            "batch job submitted"
        );

        let coordinator = self.clone();
        let dispatch_job = job.clone();
        tokio::spawn(async move {
            coordinator.dispatch(dispatch_job, candidates).await;
        });

        Ok(job_id)
    }

    /// Enqueue work units for a job, honoring the in-flight ceiling.
    async fn dispatch(&self, job: BatchJob, candidates: Vec<String>) {
        let job_id = job.job_id.clone();

        if candidates.is_empty() {
            if let Err(err) = self
                .finish(&job_id, JobState::Pending, JobState::Completed)
                .await
            {
                error!(job_id = %job_id, error = %err, "failed to finish empty job");
            }
            return;
        }

        match self
            .jobs
            .transition(&job_id, JobState::Pending, JobState::Running)
            .await
        {
            Ok(true) => {
                self.tracker.set_state(&job_id, JobState::Running);
                if let Ok(Some(mut stored)) = self.jobs.get(&job_id).await {
                    stored.state = JobState::Running;
                    stored.started_at = Some(Utc::now());
                    let _ = self.jobs.upsert(&stored).await;
                }
            }
            Ok(false) => {
                warn!(job_id = %job_id, "job left PENDING state before dispatch; aborting");
                return;
            }
            Err(err) => {
                error!(job_id = %job_id, error = %err, "could not start job");
                return;
            }
        }

        let ceiling = (self.config.in_flight_factor * job.config.concurrency).max(1) as u64;
        for chunk in candidates.chunks(job.config.batch_size) {
            // Back-pressure: never run further ahead of the workers than the
            // configured ceiling of unsettled items. Cancellation is checked
            // on every wakeup so a cancelled job stops enqueueing even while
            // the dispatcher is throttled.
            loop {
                match self.jobs.get(&job_id).await {
                    Ok(Some(current)) if current.state == JobState::Cancelled => {
                        info!(job_id = %job_id, "job cancelled; stopping dispatch");
                        return;
                    }
                    _ => {}
                }
                let Some(counters) = self.tracker.counters(&job_id) else {
                    break;
                };
                if counters.submitted - counters.settled() < ceiling {
                    break;
                }
                self.tracker.wait_progress(Duration::from_millis(500)).await;
            }

            let item = WorkItem {
                job_id: job_id.clone(),
                tenant_id: job.owner.tenant_id.clone(),
                company_id: job.owner.company_id.clone(),
                notice_ids: chunk.to_vec(),
                force_refresh: job.config.force_refresh,
            };
            if let Err(err) = self.queue.enqueue(item).await {
                error!(job_id = %job_id, error = %err, "enqueue failed; failing job");
                self.record_error(&job_id, &format!("enqueue failed: {err}")).await;
                let _ = self
                    .finish(&job_id, JobState::Running, JobState::Failed)
                    .await;
                return;
            }
            if let Err(err) = self
                .tracker
                .update(&job_id, CounterDelta::submitted(chunk.len() as u64))
            {
                error!(job_id = %job_id, error = %err, "tracker update failed during dispatch");
            }
            self.tracker.publish(&job_id);
        }

        // All units enqueued; workers may already have drained everything.
        if let Err(err) = self.try_complete(&job_id).await {
            warn!(job_id = %job_id, error = %err, "completion check after dispatch failed");
        }
    }

    /// Cancel a job. Workers drop its remaining units as skipped; in-flight
    /// items complete and report.
    pub async fn cancel(&self, job_id: &str) -> Result<bool, BatchError> {
        for from in [JobState::Pending, JobState::Running] {
            if self.jobs.transition(job_id, from, JobState::Cancelled).await? {
                self.tracker.set_state(job_id, JobState::Cancelled);
                if let Some(mut job) = self.jobs.get(job_id).await? {
                    job.state = JobState::Cancelled;
                    job.counters = self.tracker.counters(job_id).unwrap_or(job.counters);
                    job.finished_at = Some(Utc::now());
                    self.jobs.upsert(&job).await?;
                }
                info!(job_id = %job_id, "job cancelled");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Transition the job to COMPLETED/FAILED once every submitted item has
    /// settled. Safe to call repeatedly from any worker; the conditional
    /// transition makes exactly one caller win.
    pub async fn try_complete(&self, job_id: &str) -> Result<bool, BatchError> {
        let Some(counters) = self.tracker.counters(job_id) else {
            return Ok(false);
        };
        if counters.total == 0 || counters.settled() < counters.total {
            return Ok(false);
        }

        let failure_rate = counters.failure_rate();
        let target = if failure_rate > self.config.failure_ratio_limit {
            JobState::Failed
        } else {
            JobState::Completed
        };
        if !self.finish(job_id, JobState::Running, target).await? {
            return Ok(false);
        }

        // Feed the optimizer with the completed wave.
        if let Some(job) = self.jobs.get(job_id).await? {
            let throughput = self
                .tracker
                .status(job_id)
                .map(|s| s.throughput_per_sec)
                .unwrap_or(0.0);
            let next = self.optimizer.observe(
                &job.owner.tenant_id,
                WaveStats {
                    throughput,
                    failure_rate,
                },
            );
            info!(
                job_id = %job_id,
                state = ?target,
                failure_rate,
                next_batch_size = next.batch_size,
                next_concurrency = next.concurrency,
                "batch job finished"
            );
        }
        Ok(true)
    }

    /// Job view combining the persisted record with live tracker data.
    pub async fn status(&self, job_id: &str) -> Result<JobStatus, BatchError> {
        let mut job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or_else(|| BatchError::JobNotFound(job_id.to_string()))?;

        let live: Option<TrackerStatus> = self.tracker.status(job_id);
        let (throughput, eta) = match live {
            Some(status) => {
                job.state = status.state;
                job.counters = status.counters;
                (status.throughput_per_sec, status.eta_seconds)
            }
            None => (0.0, None),
        };
        Ok(JobStatus {
            job,
            throughput_per_sec: throughput,
            eta_seconds: eta,
        })
    }

    pub fn health(&self, job_id: &str) -> Option<JobHealth> {
        self.tracker.health(job_id)
    }

    pub async fn record_error(&self, job_id: &str, message: &str) {
        if let Ok(Some(mut job)) = self.jobs.get(job_id).await {
            job.last_error = Some(message.to_string());
            job.counters = self.tracker.counters(job_id).unwrap_or(job.counters);
            if let Err(err) = self.jobs.upsert(&job).await {
                warn!(job_id = %job_id, error = %err, "failed to record job error");
            }
        }
    }

    /// Conditionally finish a job and persist final counters and timestamps.
    async fn finish(
        &self,
        job_id: &str,
        from: JobState,
        to: JobState,
    ) -> Result<bool, BatchError> {
        if !self.jobs.transition(job_id, from, to).await? {
            return Ok(false);
        }
        self.tracker.set_state(job_id, to);
        if let Some(mut job) = self.jobs.get(job_id).await? {
            job.state = to;
            job.counters = self
                .tracker
                .counters(job_id)
                .unwrap_or(job.counters);
            if job.started_at.is_none() {
                job.started_at = Some(job.created_at);
            }
            job.finished_at = Some(Utc::now());
            if let Some(snapshot) = job.optimizer_snapshot.as_mut() {
                snapshot.observed_failure_rate = job.counters.failure_rate();
                snapshot.observed_throughput = self
                    .tracker
                    .status(job_id)
                    .map(|s| s.throughput_per_sec)
                    .unwrap_or(0.0);
            }
            self.jobs.upsert(&job).await?;
        }
        self.tracker.publish(job_id);
        Ok(true)
    }

    /// Consistency probe used by tests and the health surface.
    pub fn counters(&self, job_id: &str) -> Option<JobCounters> {
        self.tracker.counters(job_id)
    }
}

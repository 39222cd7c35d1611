//! Queue workers that drive match evaluations.
//!
//! A worker leases one unit at a time, evaluates each item through the match
//! engine with bounded retries, writes results to the match store, and keeps
//! the progress tracker honest. Cancellation is checked before processing:
//! units belonging to a cancelled job are drained as skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use engine::{EngineError, MatchEngine, MatchRequest};
use entities::{CompanyProfile, JobState, MatchResult};
use store::{
    retry, CompanyStore, JobStore, LeasedItem, MatchStore, OpportunityCatalog, StoreErrorKind,
    WorkItem, WorkQueue,
};

use crate::coordinator::BatchCoordinator;
use crate::tracker::CounterDelta;
use crate::types::{BatchError, WorkerConfig};

enum ItemOutcome {
    Succeeded,
    Skipped,
    Failed(String),
}

/// One worker loop instance. Deployments run several per process.
pub struct MatchWorker {
    engine: Arc<MatchEngine>,
    queue: Arc<dyn WorkQueue>,
    catalog: Arc<dyn OpportunityCatalog>,
    companies: Arc<dyn CompanyStore>,
    matches: Arc<dyn MatchStore>,
    jobs: Arc<dyn JobStore>,
    coordinator: BatchCoordinator,
    config: WorkerConfig,
}

impl MatchWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine: Arc<MatchEngine>,
        queue: Arc<dyn WorkQueue>,
        catalog: Arc<dyn OpportunityCatalog>,
        companies: Arc<dyn CompanyStore>,
        matches: Arc<dyn MatchStore>,
        jobs: Arc<dyn JobStore>,
        coordinator: BatchCoordinator,
        config: WorkerConfig,
    ) -> Self {
        Self {
            engine,
            queue,
            catalog,
            companies,
            matches,
            jobs,
            coordinator,
            config,
        }
    }

    /// Run until the shutdown flag is raised.
    pub async fn run(&self, shutdown: Arc<AtomicBool>) {
        while !shutdown.load(Ordering::Relaxed) {
            match self.run_once().await {
                Ok(0) => tokio::time::sleep(self.config.idle_backoff).await,
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "worker iteration failed");
                    tokio::time::sleep(self.config.idle_backoff).await;
                }
            }
        }
    }

    /// Lease and process up to `dequeue_max` units. Returns how many units
    /// were processed.
    pub async fn run_once(&self) -> Result<usize, BatchError> {
        let leased = self
            .queue
            .dequeue(self.config.dequeue_max, self.config.visibility)
            .await?;
        let count = leased.len();
        for lease in leased {
            self.process_lease(lease).await;
        }
        Ok(count)
    }

    async fn process_lease(&self, lease: LeasedItem) {
        let job_id = lease.item.job_id.clone();
        self.process_unit(&lease.item).await;

        if let Err(err) = self.queue.ack(lease.lease_id).await {
            warn!(job_id = %job_id, error = %err, "failed to ack processed unit");
        }
        if let Err(err) = self.coordinator.try_complete(&job_id).await {
            warn!(job_id = %job_id, error = %err, "completion check failed");
        }
        self.coordinator.tracker().publish(&job_id);
    }

    async fn process_unit(&self, item: &WorkItem) {
        let tracker = self.coordinator.tracker();

        // Cancelled jobs drain without scoring.
        let cancelled = matches!(
            self.jobs.get(&item.job_id).await,
            Ok(Some(job)) if job.state == JobState::Cancelled
        );
        if cancelled {
            debug!(job_id = %item.job_id, items = item.notice_ids.len(), "dropping unit for cancelled job");
            let _ = tracker.update(
                &item.job_id,
                CounterDelta::skipped_without_flight(item.notice_ids.len() as u64),
            );
            return;
        }

        let company = match self.companies.get(&item.company_id).await {
            Ok(Some(company)) => company,
            Ok(None) => {
                warn!(company = %item.company_id, "company vanished; failing unit items");
                self.fail_unit(item, "company profile not found").await;
                return;
            }
            Err(err) => {
                self.fail_unit(item, &format!("company lookup failed: {err}"))
                    .await;
                return;
            }
        };

        for notice_id in &item.notice_ids {
            if let Err(err) = tracker.update(&item.job_id, CounterDelta::item_started()) {
                warn!(job_id = %item.job_id, error = %err, "tracker rejected item start");
            }
            let outcome = self
                .process_item(&company, notice_id, item.force_refresh)
                .await;
            let delta = match &outcome {
                ItemOutcome::Succeeded => CounterDelta::item_succeeded(),
                ItemOutcome::Skipped => CounterDelta::item_skipped(),
                ItemOutcome::Failed(message) => {
                    warn!(job_id = %item.job_id, notice_id, error = %message, "item failed permanently");
                    self.coordinator.record_error(&item.job_id, message).await;
                    CounterDelta::item_failed()
                }
            };
            if let Err(err) = tracker.update(&item.job_id, delta) {
                warn!(job_id = %item.job_id, error = %err, "tracker rejected item outcome");
            }
        }
    }

    async fn fail_unit(&self, item: &WorkItem, message: &str) {
        let tracker = self.coordinator.tracker();
        self.coordinator.record_error(&item.job_id, message).await;
        for _ in &item.notice_ids {
            let _ = tracker.update(&item.job_id, CounterDelta::item_started());
            let _ = tracker.update(&item.job_id, CounterDelta::item_failed());
        }
    }

    /// Score one `(company, opportunity)` item. Transient faults are retried
    /// with exponential backoff; exhaustion or fatal errors fail the item.
    async fn process_item(
        &self,
        company: &CompanyProfile,
        notice_id: &str,
        force_refresh: bool,
    ) -> ItemOutcome {
        // Existing results are authoritative unless a refresh was requested.
        if !force_refresh {
            match self.matches.get(&company.company_id, notice_id).await {
                Ok(Some(_)) => return ItemOutcome::Skipped,
                Ok(None) => {}
                Err(err) => {
                    warn!(notice_id, error = %err, "result lookup failed; scoring anyway");
                }
            }
        }

        let opportunity = {
            let catalog = Arc::clone(&self.catalog);
            let id = notice_id.to_string();
            match retry::run(&self.config.retry, move |_| {
                let catalog = Arc::clone(&catalog);
                let id = id.clone();
                async move { catalog.get(&id).await }
            })
            .await
            {
                Ok(Some(opportunity)) => opportunity,
                Ok(None) => return ItemOutcome::Failed(format!("opportunity {notice_id} not found")),
                Err(err) => return ItemOutcome::Failed(format!("catalog read failed: {err}")),
            }
        };

        let request = MatchRequest {
            opportunity,
            company_profile: company.clone(),
            use_cache: !force_refresh,
            weights_override: None,
        };

        let result = match self.evaluate_with_retry(&request).await {
            Ok(result) => result,
            Err(err) => return ItemOutcome::Failed(err),
        };

        let matches = Arc::clone(&self.matches);
        let stored = retry::run(&self.config.retry, move |_| {
            let matches = Arc::clone(&matches);
            let result = result.clone();
            async move { matches.put(&result).await }
        })
        .await;
        match stored {
            Ok(()) => ItemOutcome::Succeeded,
            Err(err) => ItemOutcome::Failed(format!("result write failed: {err}")),
        }
    }

    async fn evaluate_with_retry(&self, request: &MatchRequest) -> Result<MatchResult, String> {
        let mut last_error = None;
        for attempt in 0..=self.config.retry.max_retries {
            match self.engine.evaluate(request).await {
                Ok(result) => return Ok(result),
                Err(EngineError::InvalidInput(message)) => {
                    return Err(format!("invalid input: {message}"));
                }
                Err(EngineError::UpstreamUnavailable(message)) => {
                    last_error = Some(message);
                    if attempt < self.config.retry.max_retries {
                        let delay = self
                            .config
                            .retry
                            .calculate_delay(attempt + 1, StoreErrorKind::Transient);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(format!(
            "evaluation failed after retries: {}",
            last_error.unwrap_or_else(|| "unknown".to_string())
        ))
    }
}

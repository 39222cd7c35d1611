//! Requests, configuration, and errors for the batch layer.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use entities::OpportunityFilters;
use store::{RetryConfig, StoreError};

/// Hard bounds on the per-unit batch size.
pub const BATCH_SIZE_MIN: usize = 10;
pub const BATCH_SIZE_MAX: usize = 500;
/// Hard bounds on worker concurrency.
pub const CONCURRENCY_MIN: usize = 2;
pub const CONCURRENCY_MAX: usize = 64;

/// An asynchronous request to score a company against the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchRequest {
    pub tenant_id: String,
    pub company_id: String,
    #[serde(default, rename = "opportunity_filters", alias = "filters")]
    pub filters: OpportunityFilters,
    /// Candidate partition size; defaults to the optimizer's current tuning
    /// and is clamped to `[BATCH_SIZE_MIN, BATCH_SIZE_MAX]`.
    #[serde(default)]
    pub batch_size: Option<usize>,
    /// Delete the company's stored results and rescore everything.
    #[serde(default)]
    pub force_refresh: bool,
}

impl BatchRequest {
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.tenant_id.trim().is_empty() {
            return Err(BatchError::InvalidRequest("tenant_id must not be empty".into()));
        }
        if self.company_id.trim().is_empty() {
            return Err(BatchError::InvalidRequest(
                "company_id must not be empty".into(),
            ));
        }
        if let Some(size) = self.batch_size {
            if size == 0 {
                return Err(BatchError::InvalidRequest(
                    "batch_size must be greater than zero".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Coordinator tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size_default: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency_default: usize,
    /// In-flight ceiling as a multiple of concurrency. The coordinator never
    /// lets `submitted - settled` exceed `in_flight_factor * concurrency`.
    #[serde(default = "default_in_flight_factor")]
    pub in_flight_factor: usize,
    /// Job is FAILED (not COMPLETED) above this failure ratio.
    #[serde(default = "default_failure_ratio_limit")]
    pub failure_ratio_limit: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size_default: default_batch_size(),
            concurrency_default: default_concurrency(),
            in_flight_factor: default_in_flight_factor(),
            failure_ratio_limit: default_failure_ratio_limit(),
        }
    }
}

fn default_batch_size() -> usize {
    50
}

fn default_concurrency() -> usize {
    4
}

fn default_in_flight_factor() -> usize {
    4
}

fn default_failure_ratio_limit() -> f64 {
    0.25
}

/// Worker tunables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Work units pulled per dequeue call.
    pub dequeue_max: usize,
    /// Queue visibility lease held while processing a unit.
    pub visibility: Duration,
    /// Sleep when the queue is empty.
    pub idle_backoff: Duration,
    /// Per-item retry policy for transient evaluation and store failures.
    pub retry: RetryConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            dequeue_max: 1,
            visibility: Duration::from_secs(120),
            idle_backoff: Duration::from_millis(100),
            retry: RetryConfig::worker(),
        }
    }
}

/// Errors surfaced by the batch layer.
#[derive(Debug, Clone, Error)]
pub enum BatchError {
    #[error("invalid batch request: {0}")]
    InvalidRequest(String),
    #[error("company not found: {0}")]
    CompanyNotFound(String),
    #[error("job not found: {0}")]
    JobNotFound(String),
    #[error("counter delta would decrease a monotonic counter")]
    NegativeDelta,
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
    #[error("schedule already running: {0}")]
    ScheduleBusy(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

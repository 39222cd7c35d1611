//! Requests, configuration, and errors for the match engine.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use entities::{CompanyProfile, EntityError, Opportunity};
use store::StoreError;

/// A synchronous match request: score one opportunity against one profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchRequest {
    pub opportunity: Opportunity,
    pub company_profile: CompanyProfile,
    /// Consult the fingerprint cache before scoring.
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    /// Per-request weight overrides; merged over the tenant's resolved
    /// weights and re-normalized.
    #[serde(default)]
    pub weights_override: Option<BTreeMap<String, f64>>,
}

fn default_use_cache() -> bool {
    true
}

impl MatchRequest {
    pub fn new(opportunity: Opportunity, company_profile: CompanyProfile) -> Self {
        Self {
            opportunity,
            company_profile,
            use_cache: true,
            weights_override: None,
        }
    }

    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }
}

/// Engine tunables; every option in the deployment configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Fingerprint cache entry lifetime.
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    /// Persisted match result lifetime.
    #[serde(default = "default_result_ttl_seconds")]
    pub match_result_ttl_seconds: i64,
    /// Per-scorer soft budget; exceeding it logs a warning.
    #[serde(default = "default_scorer_soft_budget_ms")]
    pub scorer_soft_budget_ms: u64,
    /// Per-scorer hard timeout; the component scores 0 with `"timeout"`.
    #[serde(default = "default_scorer_hard_timeout_ms")]
    pub scorer_hard_timeout_ms: u64,
    /// Whole-evaluation budget; exceeding it returns a partial result.
    #[serde(default = "default_orchestrator_budget_ms")]
    pub orchestrator_budget_ms: u64,
    /// Bounded fan-out width for scorer execution.
    #[serde(default = "default_scorer_pool_size")]
    pub scorer_pool_size: usize,
    #[serde(default = "default_confidence_high")]
    pub confidence_high: f64,
    #[serde(default = "default_confidence_medium")]
    pub confidence_medium: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl_seconds(),
            match_result_ttl_seconds: default_result_ttl_seconds(),
            scorer_soft_budget_ms: default_scorer_soft_budget_ms(),
            scorer_hard_timeout_ms: default_scorer_hard_timeout_ms(),
            orchestrator_budget_ms: default_orchestrator_budget_ms(),
            scorer_pool_size: default_scorer_pool_size(),
            confidence_high: default_confidence_high(),
            confidence_medium: default_confidence_medium(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.scorer_pool_size == 0 {
            return Err(EngineError::InvalidInput(
                "scorer_pool_size must be greater than zero".into(),
            ));
        }
        if self.scorer_hard_timeout_ms == 0 {
            return Err(EngineError::InvalidInput(
                "scorer_hard_timeout_ms must be greater than zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_high)
            || !(0.0..=1.0).contains(&self.confidence_medium)
            || self.confidence_medium > self.confidence_high
        {
            return Err(EngineError::InvalidInput(
                "confidence thresholds must satisfy 0 <= medium <= high <= 1".into(),
            ));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn scorer_soft_budget(&self) -> Duration {
        Duration::from_millis(self.scorer_soft_budget_ms)
    }

    pub fn scorer_hard_timeout(&self) -> Duration {
        Duration::from_millis(self.scorer_hard_timeout_ms)
    }

    pub fn orchestrator_budget(&self) -> Duration {
        Duration::from_millis(self.orchestrator_budget_ms)
    }
}

fn default_cache_ttl_seconds() -> u64 {
    86_400
}

fn default_result_ttl_seconds() -> i64 {
    entities::matching::DEFAULT_RESULT_TTL_SECONDS
}

fn default_scorer_soft_budget_ms() -> u64 {
    500
}

fn default_scorer_hard_timeout_ms() -> u64 {
    2_000
}

fn default_orchestrator_budget_ms() -> u64 {
    5_000
}

fn default_scorer_pool_size() -> usize {
    4
}

fn default_confidence_high() -> f64 {
    0.75
}

fn default_confidence_medium() -> f64 {
    0.50
}

/// Errors the engine surfaces to callers. Everything else is recovered into a
/// degraded or partial result.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Malformed request; fatal, never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A required upstream is down after internal retries; the caller may
    /// retry the whole request.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl From<EntityError> for EngineError {
    fn from(err: EntityError) -> Self {
        EngineError::InvalidInput(err.to_string())
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::UpstreamUnavailable(err.to_string())
    }
}

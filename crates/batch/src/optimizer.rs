//! Adaptive batch sizing from observed wave outcomes.
//!
//! After each completed wave the coordinator reports throughput and failure
//! rate; the optimizer proposes the next `(batch_size, concurrency)` pair.
//! Sustained failures shrink aggressively, clean waves with rising throughput
//! grow geometrically, and everything else holds. Every decision lands in a
//! per-tenant audit history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;

use crate::types::{BATCH_SIZE_MAX, BATCH_SIZE_MIN, CONCURRENCY_MAX, CONCURRENCY_MIN};

/// Observed outcome of one completed wave.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WaveStats {
    /// Items settled per second.
    pub throughput: f64,
    /// failed / submitted for the wave.
    pub failure_rate: f64,
}

/// A `(batch_size, concurrency)` proposal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchTuning {
    pub batch_size: usize,
    pub concurrency: usize,
}

/// Optimizer policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizerConfig {
    /// Two consecutive waves above this failure rate trigger a back-off.
    #[serde(default = "default_backoff_threshold")]
    pub failure_backoff_threshold: f64,
    /// Growth requires the current wave below this failure rate.
    #[serde(default = "default_growth_threshold")]
    pub failure_growth_threshold: f64,
    /// Throughput within this relative band of both prior waves counts as a
    /// plateau.
    #[serde(default = "default_plateau_tolerance")]
    pub plateau_tolerance: f64,
    #[serde(default = "default_initial_batch_size")]
    pub initial_batch_size: usize,
    #[serde(default = "default_initial_concurrency")]
    pub initial_concurrency: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            failure_backoff_threshold: default_backoff_threshold(),
            failure_growth_threshold: default_growth_threshold(),
            plateau_tolerance: default_plateau_tolerance(),
            initial_batch_size: default_initial_batch_size(),
            initial_concurrency: default_initial_concurrency(),
        }
    }
}

fn default_backoff_threshold() -> f64 {
    0.05
}

fn default_growth_threshold() -> f64 {
    0.01
}

fn default_plateau_tolerance() -> f64 {
    0.05
}

fn default_initial_batch_size() -> usize {
    50
}

fn default_initial_concurrency() -> usize {
    4
}

/// One recorded decision, kept for auditability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizationDecision {
    pub tenant_id: String,
    #[serde(with = "entities::timefmt")]
    pub at: DateTime<Utc>,
    pub action: String,
    pub stats: WaveStats,
    pub tuning: BatchTuning,
}

#[derive(Debug)]
struct TenantState {
    current: BatchTuning,
    waves: VecDeque<WaveStats>,
}

/// Per-tenant adaptive tuner.
pub struct BatchOptimizer {
    config: OptimizerConfig,
    tenants: DashMap<String, TenantState>,
    history: Mutex<Vec<OptimizationDecision>>,
}

impl BatchOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            tenants: DashMap::new(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Current tuning for a tenant (initial values before any observation).
    pub fn current(&self, tenant_id: &str) -> BatchTuning {
        self.tenants
            .get(tenant_id)
            .map(|s| s.current)
            .unwrap_or(BatchTuning {
                batch_size: self.config.initial_batch_size,
                concurrency: self.config.initial_concurrency,
            })
    }

    /// Record a completed wave and compute the next tuning.
    pub fn observe(&self, tenant_id: &str, stats: WaveStats) -> BatchTuning {
        let mut state = self
            .tenants
            .entry(tenant_id.to_string())
            .or_insert_with(|| TenantState {
                current: BatchTuning {
                    batch_size: self.config.initial_batch_size,
                    concurrency: self.config.initial_concurrency,
                },
                waves: VecDeque::new(),
            });

        let action = self.decide(&state, stats);
        let next = self.apply(state.current, &action);

        state.waves.push_back(stats);
        while state.waves.len() > 8 {
            state.waves.pop_front();
        }
        state.current = next;
        drop(state);

        info!(tenant = tenant_id, action = %action, batch_size = next.batch_size, concurrency = next.concurrency, "batch tuning decision");
        let decision = OptimizationDecision {
            tenant_id: tenant_id.to_string(),
            at: Utc::now(),
            action,
            stats,
            tuning: next,
        };
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(decision);
        next
    }

    /// Decision history for a tenant, most recent last.
    pub fn history(&self, tenant_id: &str) -> Vec<OptimizationDecision> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|d| d.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    fn decide(&self, state: &TenantState, stats: WaveStats) -> String {
        let prior = state.waves.back();
        let failing_twice = stats.failure_rate > self.config.failure_backoff_threshold
            && prior.is_some_and(|p| p.failure_rate > self.config.failure_backoff_threshold);
        if failing_twice {
            return "backoff".to_string();
        }

        if stats.failure_rate < self.config.failure_growth_threshold
            && !self.plateaued(state, stats.throughput)
        {
            return "grow".to_string();
        }

        "hold".to_string()
    }

    /// Throughput is plateaued when it sits within tolerance of both of the
    /// two prior waves.
    fn plateaued(&self, state: &TenantState, throughput: f64) -> bool {
        let waves: Vec<&WaveStats> = state.waves.iter().rev().take(2).collect();
        if waves.len() < 2 {
            return false;
        }
        waves.iter().all(|w| {
            if w.throughput <= 0.0 {
                return throughput <= 0.0;
            }
            ((throughput - w.throughput) / w.throughput).abs() <= self.config.plateau_tolerance
        })
    }

    fn apply(&self, current: BatchTuning, action: &str) -> BatchTuning {
        match action {
            "backoff" => BatchTuning {
                concurrency: (current.concurrency / 2).max(CONCURRENCY_MIN),
                batch_size: ((current.batch_size as f64 * 0.75) as usize).max(BATCH_SIZE_MIN),
            },
            "grow" => BatchTuning {
                concurrency: ((current.concurrency as f64 * 1.25).ceil() as usize)
                    .min(CONCURRENCY_MAX),
                batch_size: ((current.batch_size as f64 * 1.25).ceil() as usize)
                    .min(BATCH_SIZE_MAX),
            },
            _ => current,
        }
    }
}

impl Default for BatchOptimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

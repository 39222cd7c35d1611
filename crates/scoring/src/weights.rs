//! Component weights and per-tenant resolution.
//!
//! The resolver is the only module-level mutable state in the scoring layer:
//! a process-local cache of resolved tenant weights refreshed on a short TTL.
//! Everything else flows through function arguments.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

use store::WeightStore;

/// Tolerance on the weights-sum-to-one invariant.
pub const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// How long a resolved tenant weight vector may be served from memory.
pub const WEIGHT_CACHE_TTL: Duration = Duration::from_secs(300);

/// A validated weight vector over component names. Construction clamps
/// negatives to zero; [`ComponentWeights::normalized`] rescales to sum 1.0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentWeights {
    weights: BTreeMap<String, f64>,
}

impl ComponentWeights {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let weights = pairs
            .into_iter()
            .map(|(name, w)| (name, w.max(0.0)))
            .collect();
        Self { weights }
    }

    pub fn get(&self, name: &str) -> f64 {
        self.weights.get(name).copied().unwrap_or(0.0)
    }

    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.weights.iter()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Rescale so the weights sum to 1.0. A degenerate all-zero vector
    /// distributes uniformly instead of dividing by zero.
    pub fn normalized(&self) -> Self {
        let sum = self.sum();
        if self.weights.is_empty() {
            return self.clone();
        }
        if sum <= f64::EPSILON {
            let uniform = 1.0 / self.weights.len() as f64;
            return Self {
                weights: self
                    .weights
                    .keys()
                    .map(|k| (k.clone(), uniform))
                    .collect(),
            };
        }
        Self {
            weights: self
                .weights
                .iter()
                .map(|(k, w)| (k.clone(), w / sum))
                .collect(),
        }
    }

    /// Overlay tenant-supplied values onto this vector. Unknown component
    /// names are ignored (and logged); the result is normalized.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, f64>) -> Self {
        let mut merged = self.weights.clone();
        for (name, value) in overrides {
            match merged.get_mut(name) {
                Some(slot) => *slot = value.max(0.0),
                None => warn!(component = %name, "ignoring weight override for unknown component"),
            }
        }
        Self { weights: merged }.normalized()
    }

    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() < WEIGHT_SUM_EPSILON
    }
}

/// Resolves the effective weight vector for a tenant: override when present,
/// defaults otherwise, always normalized, cached in-process for
/// [`WEIGHT_CACHE_TTL`].
pub struct WeightResolver {
    store: Arc<dyn WeightStore>,
    defaults: ComponentWeights,
    ttl: Duration,
    cache: RwLock<HashMap<String, (ComponentWeights, Instant)>>,
}

impl WeightResolver {
    pub fn new(store: Arc<dyn WeightStore>, defaults: ComponentWeights) -> Self {
        Self {
            store,
            defaults: defaults.normalized(),
            ttl: WEIGHT_CACHE_TTL,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn defaults(&self) -> &ComponentWeights {
        &self.defaults
    }

    /// Resolve weights for a tenant. A failing weight store degrades to the
    /// defaults rather than failing the evaluation.
    pub async fn resolve(&self, tenant_id: &str) -> ComponentWeights {
        if let Some(cached) = self.cached(tenant_id) {
            return cached;
        }

        let resolved = match self.store.tenant_override(tenant_id).await {
            Ok(Some(overrides)) => self.defaults.with_overrides(&overrides),
            Ok(None) => self.defaults.clone(),
            Err(err) => {
                warn!(tenant = %tenant_id, error = %err, "weight override lookup failed; using defaults");
                return self.defaults.clone();
            }
        };

        let mut cache = self
            .cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.insert(tenant_id.to_string(), (resolved.clone(), Instant::now()));
        resolved
    }

    /// Drop all cached entries (profile/weight admin edits, teardown).
    pub fn flush(&self) {
        self.cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn cached(&self, tenant_id: &str) -> Option<ComponentWeights> {
        let cache = self
            .cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cache
            .get(tenant_id)
            .filter(|(_, at)| at.elapsed() < self.ttl)
            .map(|(weights, _)| weights.clone())
    }
}

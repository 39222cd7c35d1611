//! Scoring components for the matching engine.
//!
//! Each component measures one dimension of opportunity/company fit and
//! returns a score in `[0, 1]` plus a diagnostic detail blob. Components are
//! registered behind the [`ComponentScorer`] trait and aggregated by the
//! orchestrator with weights from the [`weights::WeightResolver`].
//!
//! Scorers are pure functions of their inputs. The single exception is
//! [`scorers::SemanticSimilarity`], which reads stored embedding vectors (and
//! may ask the embedding service to fill a gap); every other scorer computes
//! from the entities alone.

pub mod context;
pub mod scorers;
pub mod text;
pub mod weights;

pub use context::{keys, ScoringConfig, ScoringContext};
pub use weights::{ComponentWeights, WeightResolver, WEIGHT_SUM_EPSILON};

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use entities::{CompanyProfile, Opportunity};
use store::StoreError;

/// Errors raised by scoring components. Anything surfacing here is fatal for
/// the component; recoverable conditions are reported through
/// [`ComponentResult::status`] instead.
#[derive(Debug, Clone, Error)]
pub enum ScoreError {
    #[error("store error during scoring: {0}")]
    Store(#[from] StoreError),
    #[error("scorer internal error: {0}")]
    Internal(String),
}

impl ScoreError {
    /// Short class label used in `"error:<class>"` component statuses.
    pub fn class(&self) -> &'static str {
        match self {
            ScoreError::Store(_) => "store",
            ScoreError::Internal(_) => "internal",
        }
    }
}

/// Outcome of one scoring component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentResult {
    /// Always clamped to `[0, 1]`.
    pub score: f64,
    /// `"ok"`, `"degraded:<reason>"`, or `"missing_embedding"`. The
    /// orchestrator adds `"timeout"` and `"error:<class>"` for components it
    /// had to cut off.
    pub status: String,
    pub detail: serde_json::Value,
    pub processing_time_ms: f64,
}

impl ComponentResult {
    pub fn ok(score: f64, detail: serde_json::Value, started: Instant) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            status: "ok".to_string(),
            detail,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        }
    }

    pub fn degraded(
        score: f64,
        reason: &str,
        detail: serde_json::Value,
        started: Instant,
    ) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            status: format!("degraded:{reason}"),
            detail,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        }
    }

    pub fn missing_embedding(detail: serde_json::Value, started: Instant) -> Self {
        Self {
            score: 0.0,
            status: "missing_embedding".to_string(),
            detail,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// One scoring dimension.
#[async_trait]
pub trait ComponentScorer: Send + Sync {
    /// Stable component name used for weights, results, and explanations.
    fn name(&self) -> &'static str;
    /// Weight applied when no tenant override exists.
    fn default_weight(&self) -> f64;
    async fn score(
        &self,
        ctx: &ScoringContext,
        opportunity: &Opportunity,
        company: &CompanyProfile,
    ) -> Result<ComponentResult, ScoreError>;
}

/// The set of components an engine evaluates, in stable name order.
#[derive(Clone)]
pub struct ScorerRegistry {
    scorers: Vec<Arc<dyn ComponentScorer>>,
}

impl ScorerRegistry {
    /// Registry with no components; build up with [`ScorerRegistry::register`].
    pub fn empty() -> Self {
        Self { scorers: Vec::new() }
    }

    /// The standard eight-component registry with production default weights.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(scorers::SemanticSimilarity));
        registry.register(Arc::new(scorers::KeywordMatching));
        registry.register(Arc::new(scorers::NaicsAlignment));
        registry.register(Arc::new(scorers::PastPerformance));
        registry.register(Arc::new(scorers::CertificationBonus));
        registry.register(Arc::new(scorers::GeographicMatch));
        registry.register(Arc::new(scorers::CapacityFit));
        registry.register(Arc::new(scorers::RecencyFactor));
        registry
    }

    /// Insert a component, keeping the registry sorted by name. A component
    /// with a duplicate name replaces the existing one.
    pub fn register(&mut self, scorer: Arc<dyn ComponentScorer>) {
        self.scorers.retain(|s| s.name() != scorer.name());
        self.scorers.push(scorer);
        self.scorers.sort_by_key(|s| s.name());
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ComponentScorer>> {
        self.scorers.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.scorers.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.scorers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scorers.is_empty()
    }

    /// Default weights declared by the registered components.
    pub fn default_weights(&self) -> ComponentWeights {
        ComponentWeights::from_pairs(
            self.scorers
                .iter()
                .map(|s| (s.name().to_string(), s.default_weight())),
        )
    }
}

//! Match results and their derived views.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default retention for persisted match results: 90 days.
pub const DEFAULT_RESULT_TTL_SECONDS: i64 = 7_776_000;

/// Confidence tier derived from the total score. This is the only place the
/// thresholds live; a level is a pure function of the score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_score(total_score: f64) -> Self {
        Self::from_score_with(total_score, 0.75, 0.50)
    }

    /// Variant used when thresholds come from configuration.
    pub fn from_score_with(total_score: f64, high: f64, medium: f64) -> Self {
        if total_score >= high {
            ConfidenceLevel::High
        } else if total_score >= medium {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// Outcome of one scoring component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentScore {
    /// Component score in `[0, 1]`.
    pub score: f64,
    /// Weight applied during aggregation.
    pub weight: f64,
    /// `"ok"`, `"degraded:<reason>"`, `"missing_embedding"`, `"timeout"`, or
    /// `"error:<class>"`.
    pub status: String,
    /// Component-specific diagnostic payload.
    #[serde(default)]
    pub detail: serde_json::Value,
    pub processing_time_ms: f64,
}

impl ComponentScore {
    /// Weighted contribution to the total score.
    pub fn contribution(&self) -> f64 {
        self.score * self.weight
    }

    pub fn is_degraded(&self) -> bool {
        self.status != "ok"
    }
}

/// Overall disposition of a match evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcomeStatus {
    /// All components completed normally.
    #[default]
    Ok,
    /// One or more components reported a degraded status.
    Degraded,
    /// The evaluation budget expired; only the completed components count.
    Partial,
    /// The quick filter rejected the pair before scoring.
    Filtered,
}

/// The scored, explained outcome for one `(company, opportunity)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub company_id: String,
    pub opportunity_id: String,
    /// Weighted total in `[0, 1]`.
    pub total_score: f64,
    pub confidence_level: ConfidenceLevel,
    /// Per-component outcomes, keyed by component name. A BTreeMap keeps the
    /// serialized order deterministic.
    pub component_scores: BTreeMap<String, ComponentScore>,
    /// Short phrases explaining the strongest contributions, best first.
    pub match_reasons: Vec<String>,
    pub recommendations: Vec<String>,
    pub action_items: Vec<String>,
    #[serde(default)]
    pub status: MatchOutcomeStatus,
    pub processing_time_ms: f64,
    /// True when this result was served from the fingerprint cache.
    #[serde(default)]
    pub cached: bool,
    #[serde(with = "crate::timefmt")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timefmt")]
    pub expires_at: DateTime<Utc>,
}

impl MatchResult {
    /// Stamp creation and expiry from a TTL in seconds.
    pub fn with_ttl(mut self, ttl_seconds: i64) -> Self {
        self.expires_at = self.created_at + Duration::seconds(ttl_seconds);
        self
    }

    /// Sum of weighted contributions; should equal `total_score` up to float
    /// error for non-filtered results.
    pub fn weighted_sum(&self) -> f64 {
        self.component_scores.values().map(|c| c.contribution()).sum()
    }

    /// Components ranked by weighted contribution, ties broken by name
    /// ascending so explanations are stable across runs.
    pub fn ranked_components(&self) -> Vec<(&String, &ComponentScore)> {
        let mut ranked: Vec<_> = self.component_scores.iter().collect();
        ranked.sort_by(|(name_a, a), (name_b, b)| {
            b.contribution()
                .partial_cmp(&a.contribution())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| name_a.cmp(name_b))
        });
        ranked
    }
}

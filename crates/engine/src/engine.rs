//! The match orchestrator.
//!
//! One evaluation is a short serial pipeline: validate → fingerprint → cache
//! consult → quick filter → bounded concurrent scorer fan-out → weighted
//! aggregation → explanation → cache write. Component failures and timeouts
//! degrade individual scores; only malformed input fails the evaluation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::json;
use tracing::{debug, warn};

use entities::{
    ComponentScore, ConfidenceLevel, MatchOutcomeStatus, MatchResult,
};
use filter::{FilterReport, QuickFilter};
use scoring::{
    ComponentResult, ComponentScorer, ComponentWeights, ScorerRegistry, ScoringContext,
    WeightResolver,
};

use crate::cache::ResultCache;
use crate::explain;
use crate::fingerprint::fingerprint;
use crate::types::{EngineConfig, EngineError, MatchRequest};

#[cfg(test)]
mod tests;

/// Produces one explained [`MatchResult`] per request.
pub struct MatchEngine {
    filter: QuickFilter,
    registry: ScorerRegistry,
    weights: Arc<WeightResolver>,
    cache: ResultCache,
    context: ScoringContext,
    config: EngineConfig,
}

impl MatchEngine {
    pub fn new(
        filter: QuickFilter,
        registry: ScorerRegistry,
        weights: Arc<WeightResolver>,
        cache: ResultCache,
        context: ScoringContext,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            filter,
            registry,
            weights,
            cache,
            context,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ScorerRegistry {
        &self.registry
    }

    /// Purge cached results for a company (profile edits).
    pub async fn invalidate_company(&self, company_id: &str) -> usize {
        self.weights.flush();
        self.cache.invalidate_company(company_id).await
    }

    /// Run the full pipeline for one request.
    pub async fn evaluate(&self, request: &MatchRequest) -> Result<MatchResult, EngineError> {
        let started = Instant::now();
        request.opportunity.validate()?;
        request.company_profile.validate()?;

        let weights = self.resolve_weights(request).await;
        let fp = fingerprint(&request.opportunity, &request.company_profile, &weights)?;

        if request.use_cache {
            if let Some(hit) = self.cache.lookup(&fp).await {
                metrics::counter!("govmatch_cache_hits_total").increment(1);
                debug!(fingerprint = %fp, "serving cached match result");
                return Ok(hit);
            }
            metrics::counter!("govmatch_cache_misses_total").increment(1);
        }

        let report = self.filter.evaluate(
            &request.opportunity,
            &request.company_profile,
            self.context.today,
        );
        if !report.is_potential_match {
            metrics::counter!("govmatch_filter_rejections_total").increment(1);
            return Ok(self.filtered_result(request, &report, started));
        }

        let (component_scores, partial) = self.run_scorers(request, &weights).await;

        let total_score: f64 = component_scores.values().map(ComponentScore::contribution).sum();
        let confidence_level = ConfidenceLevel::from_score_with(
            total_score,
            self.config.confidence_high,
            self.config.confidence_medium,
        );
        let status = if partial {
            MatchOutcomeStatus::Partial
        } else if component_scores.values().any(ComponentScore::is_degraded) {
            MatchOutcomeStatus::Degraded
        } else {
            MatchOutcomeStatus::Ok
        };

        let explanation = explain::build(&component_scores, confidence_level);
        let now = Utc::now();
        let result = MatchResult {
            company_id: request.company_profile.company_id.clone(),
            opportunity_id: request.opportunity.notice_id.clone(),
            total_score,
            confidence_level,
            component_scores,
            match_reasons: explanation.match_reasons,
            recommendations: explanation.recommendations,
            action_items: explanation.action_items,
            status,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            cached: false,
            created_at: now,
            expires_at: now,
        }
        .with_ttl(self.config.match_result_ttl_seconds);

        self.cache.store(&fp, &result).await;
        metrics::histogram!("govmatch_match_duration_ms")
            .record(started.elapsed().as_secs_f64() * 1000.0);
        Ok(result)
    }

    async fn resolve_weights(&self, request: &MatchRequest) -> ComponentWeights {
        let resolved = self
            .weights
            .resolve(&request.company_profile.tenant_id)
            .await;
        match &request.weights_override {
            Some(overrides) => resolved.with_overrides(overrides),
            None => resolved,
        }
    }

    /// Fan the registered scorers out over a bounded pool, enforcing the
    /// per-scorer hard timeout and the whole-evaluation budget. Returns the
    /// completed component scores and whether the budget expired first.
    async fn run_scorers(
        &self,
        request: &MatchRequest,
        weights: &ComponentWeights,
    ) -> (BTreeMap<String, ComponentScore>, bool) {
        let soft = self.config.scorer_soft_budget();
        let hard = self.config.scorer_hard_timeout();
        let deadline = tokio::time::Instant::now() + self.config.orchestrator_budget();

        let mut completed: BTreeMap<String, ComponentScore> = BTreeMap::new();
        let mut partial = false;

        let mut results = stream::iter(self.registry.iter().map(|scorer| {
            let scorer = Arc::clone(scorer);
            score_component(
                scorer,
                &self.context,
                request,
                soft,
                hard,
            )
        }))
        .buffer_unordered(self.config.scorer_pool_size.max(1));

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, results.next()).await {
                Ok(Some((name, outcome))) => {
                    completed.insert(
                        name.to_string(),
                        ComponentScore {
                            score: outcome.score,
                            weight: weights.get(name),
                            status: outcome.status,
                            detail: outcome.detail,
                            processing_time_ms: outcome.processing_time_ms,
                        },
                    );
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        completed = completed.len(),
                        total = self.registry.len(),
                        "evaluation budget expired; returning partial result"
                    );
                    partial = true;
                    break;
                }
            }
        }

        (completed, partial)
    }

    /// Terminal result for a pair the quick filter rejected. Not cached: the
    /// filter itself is cheaper than a cache round trip.
    fn filtered_result(
        &self,
        request: &MatchRequest,
        report: &FilterReport,
        started: Instant,
    ) -> MatchResult {
        let now = Utc::now();
        MatchResult {
            company_id: request.company_profile.company_id.clone(),
            opportunity_id: request.opportunity.notice_id.clone(),
            total_score: 0.0,
            confidence_level: ConfidenceLevel::Low,
            component_scores: BTreeMap::new(),
            match_reasons: report.fail_reasons.clone(),
            recommendations: Vec::new(),
            action_items: vec!["Monitor for better-fit opportunities".to_string()],
            status: MatchOutcomeStatus::Filtered,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            cached: false,
            created_at: now,
            expires_at: now,
        }
        .with_ttl(self.config.match_result_ttl_seconds)
    }
}

/// Run one scorer under its hard timeout, mapping failures into degraded
/// component results so the evaluation always completes.
async fn score_component(
    scorer: Arc<dyn ComponentScorer>,
    context: &ScoringContext,
    request: &MatchRequest,
    soft: std::time::Duration,
    hard: std::time::Duration,
) -> (&'static str, ComponentResult) {
    let name = scorer.name();
    let started = Instant::now();
    let outcome = tokio::time::timeout(
        hard,
        scorer.score(context, &request.opportunity, &request.company_profile),
    )
    .await;
    let elapsed = started.elapsed();

    let result = match outcome {
        Err(_) => {
            warn!(component = name, timeout_ms = hard.as_millis() as u64, "scorer hit hard timeout");
            ComponentResult {
                score: 0.0,
                status: "timeout".to_string(),
                detail: json!({ "timeout_ms": hard.as_millis() as u64 }),
                processing_time_ms: elapsed.as_secs_f64() * 1000.0,
            }
        }
        Ok(Err(err)) => {
            warn!(component = name, error = %err, "scorer failed");
            ComponentResult {
                score: 0.0,
                status: format!("error:{}", err.class()),
                detail: json!({ "error": err.to_string() }),
                processing_time_ms: elapsed.as_secs_f64() * 1000.0,
            }
        }
        Ok(Ok(result)) => {
            if elapsed > soft {
                warn!(
                    component = name,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = soft.as_millis() as u64,
                    "scorer exceeded soft budget"
                );
            }
            result
        }
    };

    (name, result)
}

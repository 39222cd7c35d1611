use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::NaiveDate;

use entities::{
    CompanyProfile, EmployeeBucket, Location, MatchOutcomeStatus, Opportunity,
    PastPerformanceRecord,
};
use scoring::{
    ComponentResult, ComponentScorer, ScoreError, ScorerRegistry, ScoringConfig, ScoringContext,
    WeightResolver,
};
use store::memory::{HashEmbedder, MemoryCacheStore, MemoryVectorStore, MemoryWeightStore};
use store::EmbeddingService;

use crate::cache::ResultCache;
use crate::engine::MatchEngine;
use crate::types::{EngineConfig, EngineError, MatchRequest};

use filter::QuickFilter;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
}

fn opportunity() -> Opportunity {
    Opportunity {
        notice_id: "n-1".into(),
        title: "Medical records software support".into(),
        description: "Maintain and enhance medical records software systems".into(),
        naics_code: "541511".into(),
        set_aside: "Service-Disabled Veteran-Owned Small Business Set-Aside".into(),
        posted_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        archive_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
        place_of_performance: None,
        contract_value: Some("$500,000".into()),
        office: "VA TECHNOLOGY ACQUISITION CENTER".into(),
        department: "DEPT OF VETERANS AFFAIRS".into(),
    }
}

fn company() -> CompanyProfile {
    CompanyProfile {
        company_id: "c-1".into(),
        tenant_id: "t-1".into(),
        company_name: "MedSoft LLC".into(),
        capability_statement: "Medical records software maintenance and enhancement".into(),
        naics_codes: vec!["541511".into()],
        certifications: vec!["SDVOSB".into(), "Small Business".into()],
        employee_count: Some(EmployeeBucket::UpTo50),
        revenue_range: None,
        locations: vec![Location {
            state: "MD".into(),
            city: "Baltimore".into(),
        }],
        past_performance: vec![
            PastPerformanceRecord {
                agency: "Veterans Affairs".into(),
                description: "Medical records software support".into(),
                year: 2024,
            },
            PastPerformanceRecord {
                agency: "DOD".into(),
                description: "Clinical data migration".into(),
                year: 2023,
            },
            PastPerformanceRecord {
                agency: "GSA".into(),
                description: "Software maintenance".into(),
                year: 2022,
            },
        ],
        active: true,
    }
}

fn build_engine(registry: ScorerRegistry, config: EngineConfig) -> MatchEngine {
    build_engine_with(
        registry,
        config,
        Arc::new(MemoryVectorStore::new()),
        Some(Arc::new(HashEmbedder::new(64))),
    )
}

fn build_engine_with(
    registry: ScorerRegistry,
    config: EngineConfig,
    vectors: Arc<MemoryVectorStore>,
    embedder: Option<Arc<dyn EmbeddingService>>,
) -> MatchEngine {
    let weights = Arc::new(WeightResolver::new(
        Arc::new(MemoryWeightStore::new()),
        registry.default_weights(),
    ));
    let cache = ResultCache::new(Arc::new(MemoryCacheStore::new()), config.cache_ttl());
    let context =
        ScoringContext::new(vectors, embedder, ScoringConfig::default()).with_today(today());
    MatchEngine::new(
        QuickFilter::default(),
        registry,
        weights,
        cache,
        context,
        config,
    )
    .expect("engine config should be valid")
}

struct CountingScorer {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ComponentScorer for CountingScorer {
    fn name(&self) -> &'static str {
        "counting_probe"
    }

    fn default_weight(&self) -> f64 {
        1.0
    }

    async fn score(
        &self,
        _ctx: &ScoringContext,
        _opportunity: &Opportunity,
        _company: &CompanyProfile,
    ) -> Result<ComponentResult, ScoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ComponentResult::ok(
            0.6,
            serde_json::Value::Null,
            Instant::now(),
        ))
    }
}

struct SlowScorer {
    delay_ms: u64,
}

#[async_trait]
impl ComponentScorer for SlowScorer {
    fn name(&self) -> &'static str {
        "slow_probe"
    }

    fn default_weight(&self) -> f64 {
        0.5
    }

    async fn score(
        &self,
        _ctx: &ScoringContext,
        _opportunity: &Opportunity,
        _company: &CompanyProfile,
    ) -> Result<ComponentResult, ScoreError> {
        tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        Ok(ComponentResult::ok(
            1.0,
            serde_json::Value::Null,
            Instant::now(),
        ))
    }
}

struct FailingScorer;

#[async_trait]
impl ComponentScorer for FailingScorer {
    fn name(&self) -> &'static str {
        "failing_probe"
    }

    fn default_weight(&self) -> f64 {
        0.5
    }

    async fn score(
        &self,
        _ctx: &ScoringContext,
        _opportunity: &Opportunity,
        _company: &CompanyProfile,
    ) -> Result<ComponentResult, ScoreError> {
        Err(ScoreError::Internal("synthetic failure".into()))
    }
}

#[tokio::test]
async fn aligned_pair_scores_medium_or_better() {
    let engine = build_engine(ScorerRegistry::standard(), EngineConfig::default());
    let request = MatchRequest::new(opportunity(), company());
    let result = engine.evaluate(&request).await.unwrap();

    assert!(result.total_score >= 0.5, "total was {}", result.total_score);
    assert_eq!(result.component_scores.len(), 8);
    assert_eq!(result.component_scores["naics_alignment"].score, 1.0);
    assert_eq!(result.component_scores["certification_bonus"].score, 1.0);
    assert!(!result.match_reasons.is_empty());
    assert!(!result.cached);
}

#[tokio::test]
async fn weighted_sum_matches_total() {
    let engine = build_engine(ScorerRegistry::standard(), EngineConfig::default());
    let request = MatchRequest::new(opportunity(), company()).without_cache();
    let result = engine.evaluate(&request).await.unwrap();
    assert!((result.weighted_sum() - result.total_score).abs() < 1e-9);
}

#[tokio::test]
async fn evaluation_is_deterministic() {
    let engine = build_engine(ScorerRegistry::standard(), EngineConfig::default());
    let request = MatchRequest::new(opportunity(), company()).without_cache();
    let a = engine.evaluate(&request).await.unwrap();
    let b = engine.evaluate(&request).await.unwrap();

    assert_eq!(a.total_score, b.total_score);
    assert_eq!(a.match_reasons, b.match_reasons);
    assert_eq!(a.confidence_level, b.confidence_level);
    for (name, score) in &a.component_scores {
        let other = &b.component_scores[name];
        assert_eq!(score.score, other.score, "component {name} diverged");
        assert_eq!(score.weight, other.weight);
        assert_eq!(score.status, other.status);
    }
}

#[tokio::test]
async fn cache_hit_skips_scoring() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ScorerRegistry::empty();
    registry.register(Arc::new(CountingScorer {
        calls: Arc::clone(&calls),
    }));
    let engine = build_engine(registry, EngineConfig::default());
    let request = MatchRequest::new(opportunity(), company());

    let first = engine.evaluate(&request).await.unwrap();
    assert!(!first.cached);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let second = engine.evaluate(&request).await.unwrap();
    assert!(second.cached);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "scorers ran on a cache hit");
    assert_eq!(second.total_score, first.total_score);
}

#[tokio::test]
async fn changed_input_bypasses_stale_cache_entry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ScorerRegistry::empty();
    registry.register(Arc::new(CountingScorer {
        calls: Arc::clone(&calls),
    }));
    let engine = build_engine(registry, EngineConfig::default());

    engine
        .evaluate(&MatchRequest::new(opportunity(), company()))
        .await
        .unwrap();

    let mut edited = opportunity();
    edited.description = "Substantially revised scope".into();
    engine
        .evaluate(&MatchRequest::new(edited, company()))
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn set_aside_mismatch_short_circuits() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ScorerRegistry::empty();
    registry.register(Arc::new(CountingScorer {
        calls: Arc::clone(&calls),
    }));
    let engine = build_engine(registry, EngineConfig::default());

    let mut opp = opportunity();
    opp.set_aside = "8(a) Set-Aside".into();
    let result = engine
        .evaluate(&MatchRequest::new(opp, company()))
        .await
        .unwrap();

    assert_eq!(result.status, MatchOutcomeStatus::Filtered);
    assert_eq!(result.total_score, 0.0);
    assert_eq!(result.confidence_level, entities::ConfidenceLevel::Low);
    assert!(result.component_scores.is_empty());
    assert!(result.match_reasons.iter().any(|r| r.contains("set_aside")));
    assert_eq!(calls.load(Ordering::SeqCst), 0, "no scorer should run");
}

#[tokio::test]
async fn missing_embeddings_degrade_without_failing() {
    let engine = build_engine_with(
        ScorerRegistry::standard(),
        EngineConfig::default(),
        Arc::new(MemoryVectorStore::new()),
        None,
    );
    let result = engine
        .evaluate(&MatchRequest::new(opportunity(), company()))
        .await
        .unwrap();

    let semantic = &result.component_scores["semantic_similarity"];
    assert_eq!(semantic.score, 0.0);
    assert_eq!(semantic.status, "missing_embedding");
    assert_eq!(result.status, MatchOutcomeStatus::Degraded);
    assert!(result.total_score > 0.0, "other components still contribute");
}

#[tokio::test]
async fn hard_timeout_zeroes_the_component() {
    let mut registry = ScorerRegistry::empty();
    registry.register(Arc::new(SlowScorer { delay_ms: 200 }));
    registry.register(Arc::new(CountingScorer {
        calls: Arc::new(AtomicUsize::new(0)),
    }));
    let config = EngineConfig {
        scorer_hard_timeout_ms: 20,
        ..Default::default()
    };
    let engine = build_engine(registry, config);
    let result = engine
        .evaluate(&MatchRequest::new(opportunity(), company()).without_cache())
        .await
        .unwrap();

    let slow = &result.component_scores["slow_probe"];
    assert_eq!(slow.score, 0.0);
    assert_eq!(slow.status, "timeout");
    assert_eq!(result.component_scores["counting_probe"].status, "ok");
}

#[tokio::test]
async fn scorer_errors_are_contained() {
    let mut registry = ScorerRegistry::empty();
    registry.register(Arc::new(FailingScorer));
    registry.register(Arc::new(CountingScorer {
        calls: Arc::new(AtomicUsize::new(0)),
    }));
    let engine = build_engine(registry, EngineConfig::default());
    let result = engine
        .evaluate(&MatchRequest::new(opportunity(), company()).without_cache())
        .await
        .unwrap();

    let failing = &result.component_scores["failing_probe"];
    assert_eq!(failing.score, 0.0);
    assert_eq!(failing.status, "error:internal");
    assert_eq!(result.status, MatchOutcomeStatus::Degraded);
}

#[tokio::test]
async fn orchestrator_budget_yields_partial_result() {
    let mut registry = ScorerRegistry::empty();
    registry.register(Arc::new(SlowScorer { delay_ms: 500 }));
    registry.register(Arc::new(CountingScorer {
        calls: Arc::new(AtomicUsize::new(0)),
    }));
    let config = EngineConfig {
        orchestrator_budget_ms: 50,
        scorer_hard_timeout_ms: 2_000,
        ..Default::default()
    };
    let engine = build_engine(registry, config);
    let result = engine
        .evaluate(&MatchRequest::new(opportunity(), company()).without_cache())
        .await
        .unwrap();

    assert_eq!(result.status, MatchOutcomeStatus::Partial);
    assert!(result.component_scores.contains_key("counting_probe"));
    assert!(!result.component_scores.contains_key("slow_probe"));
}

#[tokio::test]
async fn invalid_input_fails_fast() {
    let engine = build_engine(ScorerRegistry::standard(), EngineConfig::default());
    let mut opp = opportunity();
    opp.notice_id = String::new();
    let err = engine
        .evaluate(&MatchRequest::new(opp, company()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn weight_override_renormalizes() {
    let engine = build_engine(ScorerRegistry::standard(), EngineConfig::default());
    let mut overrides = BTreeMap::new();
    overrides.insert("semantic_similarity".to_string(), 0.0);
    let mut request = MatchRequest::new(opportunity(), company()).without_cache();
    request.weights_override = Some(overrides);

    let result = engine.evaluate(&request).await.unwrap();
    assert_eq!(result.component_scores["semantic_similarity"].weight, 0.0);
    let weight_sum: f64 = result.component_scores.values().map(|c| c.weight).sum();
    assert!((weight_sum - 1.0).abs() < 1e-6);
    assert!((result.weighted_sum() - result.total_score).abs() < 1e-9);
}

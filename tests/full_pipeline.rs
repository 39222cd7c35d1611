//! End-to-end matching scenarios over the full in-memory stack.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};

use govmatch::{
    build_memory_stack, ConfidenceLevel, EngineConfig, GovMatchConfig, MatchEngine,
    MatchOutcomeStatus, MatchRequest, QuickFilter, ResultCache, ScorerRegistry, ScoringConfig,
    ScoringContext, WeightResolver,
};
use entities::{
    CompanyProfile, EmployeeBucket, Location, Opportunity, PastPerformanceRecord,
    PlaceOfPerformance,
};
use store::memory::{MemoryCacheStore, MemoryVectorStore, MemoryWeightStore};

fn active_window() -> (NaiveDate, NaiveDate) {
    let today = Utc::now().date_naive();
    (today - chrono::Duration::days(10), today + chrono::Duration::days(30))
}

fn opportunity() -> Opportunity {
    let (posted, archive) = active_window();
    Opportunity {
        notice_id: "9fbe7f8d1de14ed7a3d5b7f4be40cef4".into(),
        title: "Medical software systems support".into(),
        description: "Maintain and enhance medical records software systems for clinics".into(),
        naics_code: "541511".into(),
        set_aside: "Service-Disabled Veteran-Owned Small Business Set-Aside".into(),
        posted_date: posted,
        archive_date: archive,
        place_of_performance: Some(PlaceOfPerformance {
            state: "MD".into(),
            city: "Bethesda".into(),
        }),
        contract_value: Some("$750,000".into()),
        office: "DEFENSE HEALTH AGENCY".into(),
        department: "DEPT OF DEFENSE".into(),
    }
}

fn company() -> CompanyProfile {
    let this_year = Utc::now().year();
    CompanyProfile {
        company_id: "e4d8f458-b031-70ed".into(),
        tenant_id: "tenant-a".into(),
        company_name: "MedPACS, LLC".into(),
        capability_statement:
            "Medical records software systems: maintenance, enhancement, and clinic support".into(),
        naics_codes: vec!["541511".into(), "541512".into()],
        certifications: vec!["SDVOSB".into(), "SBA Small Business".into()],
        employee_count: Some(EmployeeBucket::UpTo10),
        revenue_range: Some("Under $1M".into()),
        locations: vec![Location {
            state: "MD".into(),
            city: "Salisbury".into(),
        }],
        past_performance: (0..5)
            .map(|i| PastPerformanceRecord {
                agency: "Defense Health Agency".into(),
                description: format!("Medical records software support, task {i}"),
                year: this_year - (i as i32 % 3),
            })
            .collect(),
        active: true,
    }
}

#[tokio::test]
async fn exact_naics_sdvosb_pair_scores_medium_or_better() {
    let stack = build_memory_stack(&GovMatchConfig::default()).unwrap();
    let result = stack
        .engine
        .evaluate(&MatchRequest::new(opportunity(), company()))
        .await
        .unwrap();

    assert_ne!(result.status, MatchOutcomeStatus::Filtered);
    assert_eq!(result.component_scores["naics_alignment"].score, 1.0);
    assert_eq!(result.component_scores["certification_bonus"].score, 1.0);
    assert!(
        result.total_score >= 0.60,
        "total was {}",
        result.total_score
    );
    assert!(matches!(
        result.confidence_level,
        ConfidenceLevel::Medium | ConfidenceLevel::High
    ));
    assert!(!result.match_reasons.is_empty());
    assert!((result.weighted_sum() - result.total_score).abs() < 1e-9);
}

#[tokio::test]
async fn set_aside_mismatch_short_circuits_scoring() {
    let stack = build_memory_stack(&GovMatchConfig::default()).unwrap();
    let mut opp = opportunity();
    opp.set_aside = "8(a) Set-Aside".into();

    let result = stack
        .engine
        .evaluate(&MatchRequest::new(opp, company()))
        .await
        .unwrap();

    assert_eq!(result.status, MatchOutcomeStatus::Filtered);
    assert_eq!(result.total_score, 0.0);
    assert_eq!(result.confidence_level, ConfidenceLevel::Low);
    assert!(result.component_scores.is_empty());
    assert!(result
        .match_reasons
        .iter()
        .any(|r| r.contains("not certified")));
}

#[tokio::test]
async fn archived_opportunity_is_rejected_and_excluded_from_batches() {
    let stack = build_memory_stack(&GovMatchConfig::default()).unwrap();
    let mut archived = opportunity();
    archived.archive_date = Utc::now().date_naive() - chrono::Duration::days(1);

    // Synchronous path: quick filter active check fails.
    let result = stack
        .engine
        .evaluate(&MatchRequest::new(archived.clone(), company()))
        .await
        .unwrap();
    assert_eq!(result.status, MatchOutcomeStatus::Filtered);
    assert!(result.match_reasons.iter().any(|r| r.contains("archived")));

    // Batch path: the candidate scan excludes it.
    stack.companies.insert(company());
    stack.catalog.insert(archived);
    stack.catalog.insert(opportunity());
    let job_id = stack
        .coordinator
        .submit(govmatch::BatchRequest {
            tenant_id: "tenant-a".into(),
            company_id: company().company_id,
            filters: Default::default(),
            batch_size: None,
            force_refresh: false,
        })
        .await
        .unwrap();
    let status = stack.coordinator.status(&job_id).await.unwrap();
    assert_eq!(status.job.counters.total, 1);
}

#[tokio::test]
async fn missing_embeddings_degrade_gracefully() {
    // Engine without an embedding fallback: stored vectors are the only
    // source, and none exist.
    let registry = ScorerRegistry::standard();
    let weights = Arc::new(WeightResolver::new(
        Arc::new(MemoryWeightStore::new()),
        registry.default_weights(),
    ));
    let cache = ResultCache::new(
        Arc::new(MemoryCacheStore::new()),
        std::time::Duration::from_secs(3600),
    );
    let context = ScoringContext::new(
        Arc::new(MemoryVectorStore::new()),
        None,
        ScoringConfig::default(),
    );
    let engine = MatchEngine::new(
        QuickFilter::default(),
        registry,
        weights,
        cache,
        context,
        EngineConfig::default(),
    )
    .unwrap();

    let result = engine
        .evaluate(&MatchRequest::new(opportunity(), company()))
        .await
        .unwrap();

    let semantic = &result.component_scores["semantic_similarity"];
    assert_eq!(semantic.score, 0.0);
    assert_eq!(semantic.status, "missing_embedding");
    assert_eq!(result.status, MatchOutcomeStatus::Degraded);
    // Every other component still contributed.
    assert!(result.total_score > 0.0);
    assert_eq!(result.component_scores.len(), 8);
}

#[tokio::test]
async fn second_identical_call_is_served_from_cache() {
    let stack = build_memory_stack(&GovMatchConfig::default()).unwrap();
    let request = MatchRequest::new(opportunity(), company());

    let first = stack.engine.evaluate(&request).await.unwrap();
    assert!(!first.cached);

    let second = stack.engine.evaluate(&request).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.total_score, first.total_score);
    assert_eq!(second.component_scores.len(), first.component_scores.len());
    assert_eq!(second.match_reasons, first.match_reasons);
}

#[tokio::test]
async fn profile_edit_invalidates_cached_results() {
    let stack = build_memory_stack(&GovMatchConfig::default()).unwrap();
    let request = MatchRequest::new(opportunity(), company());

    stack.engine.evaluate(&request).await.unwrap();
    let invalidated = stack
        .engine
        .invalidate_company(&company().company_id)
        .await;
    assert_eq!(invalidated, 1);

    let after = stack.engine.evaluate(&request).await.unwrap();
    assert!(!after.cached);
}

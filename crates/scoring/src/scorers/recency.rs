//! Freshness of the company's delivery history.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Datelike;
use serde_json::json;

use entities::{CompanyProfile, Opportunity};

use crate::context::ScoringContext;
use crate::{ComponentResult, ComponentScorer, ScoreError};

/// No recent work is still worth a moderate baseline: history ages, it does
/// not disqualify.
const BASELINE: f64 = 0.5;
const SOME_RECENT: f64 = 0.7;
const STRONG_RECENT: f64 = 1.0;

pub struct RecencyFactor;

#[async_trait]
impl ComponentScorer for RecencyFactor {
    fn name(&self) -> &'static str {
        "recency_factor"
    }

    fn default_weight(&self) -> f64 {
        0.05
    }

    async fn score(
        &self,
        ctx: &ScoringContext,
        _opportunity: &Opportunity,
        company: &CompanyProfile,
    ) -> Result<ComponentResult, ScoreError> {
        let started = Instant::now();

        // A window of N years includes the current calendar year.
        let cutoff = ctx.today.year() - (ctx.config.recency_window_years - 1);
        let recent = company
            .past_performance
            .iter()
            .filter(|r| r.year >= cutoff)
            .count();

        let score = match recent {
            0 => BASELINE,
            1..=2 => SOME_RECENT,
            _ => STRONG_RECENT,
        };

        Ok(ComponentResult::ok(
            score,
            json!({
                "recent_records": recent,
                "cutoff_year": cutoff,
                "total_records": company.past_performance.len(),
            }),
            started,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ScoringConfig;
    use chrono::NaiveDate;
    use entities::PastPerformanceRecord;
    use std::sync::Arc;
    use store::memory::MemoryVectorStore;

    fn ctx() -> ScoringContext {
        ScoringContext::new(
            Arc::new(MemoryVectorStore::new()),
            None,
            ScoringConfig::default(),
        )
        .with_today(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap())
    }

    fn opportunity() -> Opportunity {
        Opportunity {
            notice_id: "n-1".into(),
            title: "Support".into(),
            description: String::new(),
            naics_code: "541511".into(),
            set_aside: String::new(),
            posted_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            archive_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            place_of_performance: None,
            contract_value: None,
            office: String::new(),
            department: String::new(),
        }
    }

    fn company(years: &[i32]) -> CompanyProfile {
        CompanyProfile {
            company_id: "c-1".into(),
            tenant_id: "t-1".into(),
            company_name: "Acme".into(),
            capability_statement: String::new(),
            naics_codes: vec![],
            certifications: vec![],
            employee_count: None,
            revenue_range: None,
            locations: vec![],
            past_performance: years
                .iter()
                .map(|y| PastPerformanceRecord {
                    agency: "GSA".into(),
                    description: String::new(),
                    year: *y,
                })
                .collect(),
            active: true,
        }
    }

    #[tokio::test]
    async fn no_history_scores_baseline() {
        let result = RecencyFactor
            .score(&ctx(), &opportunity(), &company(&[]))
            .await
            .unwrap();
        assert!((result.score - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn old_history_scores_baseline() {
        let result = RecencyFactor
            .score(&ctx(), &opportunity(), &company(&[2018, 2019, 2020]))
            .await
            .unwrap();
        assert!((result.score - 0.5).abs() < 1e-9);
        assert_eq!(result.detail["recent_records"], 0);
    }

    #[tokio::test]
    async fn window_includes_current_year_minus_two() {
        // Window of 3 years from 2025 covers 2023, 2024, 2025.
        let result = RecencyFactor
            .score(&ctx(), &opportunity(), &company(&[2023]))
            .await
            .unwrap();
        assert!((result.score - 0.7).abs() < 1e-9);

        let result = RecencyFactor
            .score(&ctx(), &opportunity(), &company(&[2022]))
            .await
            .unwrap();
        assert!((result.score - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn three_recent_records_score_full() {
        let result = RecencyFactor
            .score(&ctx(), &opportunity(), &company(&[2023, 2024, 2025, 2019]))
            .await
            .unwrap();
        assert!((result.score - 1.0).abs() < 1e-9);
        assert_eq!(result.detail["recent_records"], 3);
    }
}

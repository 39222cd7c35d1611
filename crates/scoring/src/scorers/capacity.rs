//! Contract-value versus company-size fit.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;

use entities::{CompanyProfile, Opportunity};

use crate::context::ScoringContext;
use crate::{ComponentResult, ComponentScorer, ScoreError};

/// Neutral score when nothing flags the pairing.
const DEFAULT_FIT: f64 = 0.8;
const OVERSIZED_CONTRACT: f64 = 0.3;
const UNDERSIZED_CONTRACT: f64 = 0.6;

pub struct CapacityFit;

#[async_trait]
impl ComponentScorer for CapacityFit {
    fn name(&self) -> &'static str {
        "capacity_fit"
    }

    fn default_weight(&self) -> f64 {
        0.05
    }

    async fn score(
        &self,
        ctx: &ScoringContext,
        opportunity: &Opportunity,
        company: &CompanyProfile,
    ) -> Result<ComponentResult, ScoreError> {
        let started = Instant::now();
        let thresholds = &ctx.config.capacity;

        let (Some(value), Some(bucket)) =
            (opportunity.parsed_contract_value(), company.employee_count)
        else {
            return Ok(ComponentResult::ok(
                DEFAULT_FIT,
                json!({ "reason": "value or headcount unknown" }),
                started,
            ));
        };

        let small_company = bucket
            .max_employees()
            .is_some_and(|max| max <= thresholds.small_company_max_employees);
        let large_company = bucket.min_employees() > thresholds.large_company_min_employees;

        let (score, assessment) = if value > thresholds.large_contract_floor && small_company {
            (OVERSIZED_CONTRACT, "contract likely exceeds delivery capacity")
        } else if value < thresholds.small_contract_ceiling && large_company {
            (UNDERSIZED_CONTRACT, "contract small for company size")
        } else {
            (DEFAULT_FIT, "within expected capacity")
        };

        Ok(ComponentResult::ok(
            score,
            json!({
                "contract_value": value,
                "employee_bucket": bucket,
                "assessment": assessment,
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
    use entities::EmployeeBucket;
    use std::sync::Arc;
    use store::memory::MemoryVectorStore;

    fn ctx() -> ScoringContext {
        ScoringContext::new(
            Arc::new(MemoryVectorStore::new()),
            None,
            ScoringConfig::default(),
        )
    }

    fn opportunity(value: Option<&str>) -> Opportunity {
        Opportunity {
            notice_id: "n-1".into(),
            title: "Support".into(),
            description: String::new(),
            naics_code: "541511".into(),
            set_aside: String::new(),
            posted_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            archive_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            place_of_performance: None,
            contract_value: value.map(String::from),
            office: String::new(),
            department: String::new(),
        }
    }

    fn company(bucket: Option<EmployeeBucket>) -> CompanyProfile {
        CompanyProfile {
            company_id: "c-1".into(),
            tenant_id: "t-1".into(),
            company_name: "Acme".into(),
            capability_statement: String::new(),
            naics_codes: vec![],
            certifications: vec![],
            employee_count: bucket,
            revenue_range: None,
            locations: vec![],
            past_performance: vec![],
            active: true,
        }
    }

    #[tokio::test]
    async fn unknown_inputs_score_default() {
        let result = CapacityFit
            .score(&ctx(), &opportunity(None), &company(Some(EmployeeBucket::UpTo10)))
            .await
            .unwrap();
        assert!((result.score - 0.8).abs() < 1e-9);

        let result = CapacityFit
            .score(&ctx(), &opportunity(Some("$5,000,000")), &company(None))
            .await
            .unwrap();
        assert!((result.score - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unparseable_value_scores_default() {
        let result = CapacityFit
            .score(
                &ctx(),
                &opportunity(Some("see attachment")),
                &company(Some(EmployeeBucket::UpTo10)),
            )
            .await
            .unwrap();
        assert!((result.score - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn oversized_contract_for_small_company() {
        let result = CapacityFit
            .score(
                &ctx(),
                &opportunity(Some("$15,000,000")),
                &company(Some(EmployeeBucket::UpTo10)),
            )
            .await
            .unwrap();
        assert!((result.score - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn undersized_contract_for_large_company() {
        let result = CapacityFit
            .score(
                &ctx(),
                &opportunity(Some("$50,000")),
                &company(Some(EmployeeBucket::UpTo500)),
            )
            .await
            .unwrap();
        assert!((result.score - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn reasonable_pairing_scores_default() {
        let result = CapacityFit
            .score(
                &ctx(),
                &opportunity(Some("$500,000")),
                &company(Some(EmployeeBucket::UpTo50)),
            )
            .await
            .unwrap();
        assert!((result.score - 0.8).abs() < 1e-9);
    }
}

//! Set-aside advantage from held certifications.
//!
//! This component measures *advantage*, not eligibility: the quick filter
//! already rejected ineligible pairs. Open solicitations confer no advantage,
//! so they score zero here.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;

use entities::{CompanyProfile, Opportunity};

use crate::context::ScoringContext;
use crate::{ComponentResult, ComponentScorer, ScoreError};

const FULL_ADVANTAGE: f64 = 1.0;
const ADJACENT_ADVANTAGE: f64 = 0.5;

pub struct CertificationBonus;

#[async_trait]
impl ComponentScorer for CertificationBonus {
    fn name(&self) -> &'static str {
        "certification_bonus"
    }

    fn default_weight(&self) -> f64 {
        0.10
    }

    async fn score(
        &self,
        _ctx: &ScoringContext,
        opportunity: &Opportunity,
        company: &CompanyProfile,
    ) -> Result<ComponentResult, ScoreError> {
        let started = Instant::now();

        let Some(class) = opportunity.set_aside_class() else {
            return Ok(ComponentResult::ok(
                0.0,
                json!({ "reason": "open solicitation; no set-aside advantage" }),
                started,
            ));
        };

        let held = company.normalized_certifications();
        let score = if company.holds_any_certification(class.qualifying_certifications()) {
            FULL_ADVANTAGE
        } else if company.holds_any_certification(class.adjacent_certifications()) {
            ADJACENT_ADVANTAGE
        } else {
            0.0
        };

        Ok(ComponentResult::ok(
            score,
            json!({
                "set_aside": class.token(),
                "certifications": held,
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
    use std::sync::Arc;
    use store::memory::MemoryVectorStore;

    fn ctx() -> ScoringContext {
        ScoringContext::new(
            Arc::new(MemoryVectorStore::new()),
            None,
            ScoringConfig::default(),
        )
    }

    fn opportunity(set_aside: &str) -> Opportunity {
        Opportunity {
            notice_id: "n-1".into(),
            title: "Support".into(),
            description: String::new(),
            naics_code: "541511".into(),
            set_aside: set_aside.into(),
            posted_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            archive_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            place_of_performance: None,
            contract_value: None,
            office: String::new(),
            department: String::new(),
        }
    }

    fn company(certs: &[&str]) -> CompanyProfile {
        CompanyProfile {
            company_id: "c-1".into(),
            tenant_id: "t-1".into(),
            company_name: "Acme".into(),
            capability_statement: String::new(),
            naics_codes: vec![],
            certifications: certs.iter().map(|c| c.to_string()).collect(),
            employee_count: None,
            revenue_range: None,
            locations: vec![],
            past_performance: vec![],
            active: true,
        }
    }

    #[tokio::test]
    async fn open_solicitation_confers_no_advantage() {
        let result = CertificationBonus
            .score(&ctx(), &opportunity(""), &company(&["SDVOSB"]))
            .await
            .unwrap();
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn matching_certification_scores_full() {
        let result = CertificationBonus
            .score(
                &ctx(),
                &opportunity("SDVOSB Set-Aside"),
                &company(&["SDVOSB", "Small Business"]),
            )
            .await
            .unwrap();
        assert_eq!(result.score, 1.0);
    }

    #[tokio::test]
    async fn sdvosb_fully_qualifies_for_vosb() {
        let result = CertificationBonus
            .score(
                &ctx(),
                &opportunity("Veteran-Owned Small Business Set-Aside"),
                &company(&["SDVOSB"]),
            )
            .await
            .unwrap();
        assert_eq!(result.score, 1.0);
    }

    #[tokio::test]
    async fn vosb_is_adjacent_for_sdvosb_set_aside() {
        let result = CertificationBonus
            .score(
                &ctx(),
                &opportunity("Service-Disabled Veteran-Owned Set-Aside"),
                &company(&["Veteran-Owned"]),
            )
            .await
            .unwrap();
        assert_eq!(result.score, 0.5);
    }

    #[tokio::test]
    async fn unrelated_certifications_score_zero() {
        let result = CertificationBonus
            .score(&ctx(), &opportunity("8(a) Set-Aside"), &company(&["WOSB"]))
            .await
            .unwrap();
        assert_eq!(result.score, 0.0);
    }
}

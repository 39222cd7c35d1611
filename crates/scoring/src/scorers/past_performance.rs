//! Track-record depth with an agency-familiarity bonus.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;

use entities::{CompanyProfile, Opportunity};

use crate::context::ScoringContext;
use crate::{ComponentResult, ComponentScorer, ScoreError};

const AGENCY_BONUS: f64 = 0.1;

/// Count-based tier for the number of delivered contracts.
fn tier_score(count: usize) -> f64 {
    match count {
        0 => 0.0,
        1..=2 => 0.5,
        3..=4 => 0.7,
        _ => 0.9,
    }
}

/// Does any past-performance agency appear in the buying organization string?
/// Matches the whole agency name or any of its tokens of three or more
/// characters, so `"DOD"` hits `"DEPT OF DEFENSE (DOD)"` and `"Department of
/// Veterans Affairs"` hits on `"VETERANS"`.
fn agency_match(company: &CompanyProfile, buying_org: &str) -> Option<String> {
    let org = buying_org.to_uppercase();
    if org.trim().is_empty() {
        return None;
    }
    for record in &company.past_performance {
        let agency = record.agency.trim().to_uppercase();
        if agency.is_empty() {
            continue;
        }
        if org.contains(&agency) {
            return Some(record.agency.clone());
        }
        let token_hit = agency
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| t.len() >= 3 && *t != "THE" && *t != "AND" && *t != "DEPARTMENT")
            .any(|t| org.contains(t));
        if token_hit {
            return Some(record.agency.clone());
        }
    }
    None
}

pub struct PastPerformance;

#[async_trait]
impl ComponentScorer for PastPerformance {
    fn name(&self) -> &'static str {
        "past_performance"
    }

    fn default_weight(&self) -> f64 {
        0.20
    }

    async fn score(
        &self,
        _ctx: &ScoringContext,
        opportunity: &Opportunity,
        company: &CompanyProfile,
    ) -> Result<ComponentResult, ScoreError> {
        let started = Instant::now();

        let count = company.past_performance.len();
        let base = tier_score(count);
        let buying_org = format!("{} {}", opportunity.department, opportunity.office);
        let matched_agency = agency_match(company, &buying_org);
        let score = if matched_agency.is_some() {
            (base + AGENCY_BONUS).min(1.0)
        } else {
            base
        };

        Ok(ComponentResult::ok(
            score,
            json!({
                "record_count": count,
                "tier_score": base,
                "agency_match": matched_agency,
            }),
            started,
        ))
    }
}

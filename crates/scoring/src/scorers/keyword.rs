//! Token overlap between solicitation text and company capability text.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;

use entities::{CompanyProfile, Opportunity};

use crate::context::ScoringContext;
use crate::text::{overlap_score, tokenize};
use crate::{ComponentResult, ComponentScorer, ScoreError};

/// How many shared terms to surface in the detail blob.
const SHARED_TERM_SAMPLE: usize = 10;

pub struct KeywordMatching;

#[async_trait]
impl ComponentScorer for KeywordMatching {
    fn name(&self) -> &'static str {
        "keyword_matching"
    }

    fn default_weight(&self) -> f64 {
        0.15
    }

    async fn score(
        &self,
        _ctx: &ScoringContext,
        opportunity: &Opportunity,
        company: &CompanyProfile,
    ) -> Result<ComponentResult, ScoreError> {
        let started = Instant::now();

        let opp_tokens = tokenize(&format!(
            "{} {}",
            opportunity.title, opportunity.description
        ));
        let mut company_text = company.capability_statement.clone();
        for record in &company.past_performance {
            company_text.push(' ');
            company_text.push_str(&record.description);
        }
        let company_tokens = tokenize(&company_text);

        if opp_tokens.is_empty() || company_tokens.is_empty() {
            return Ok(ComponentResult::degraded(
                0.0,
                "missing_text",
                json!({
                    "opportunity_terms": opp_tokens.len(),
                    "company_terms": company_tokens.len(),
                }),
                started,
            ));
        }

        let (score, mut shared) = overlap_score(&opp_tokens, &company_tokens);
        shared.truncate(SHARED_TERM_SAMPLE);

        Ok(ComponentResult::ok(
            score,
            json!({
                "opportunity_terms": opp_tokens.len(),
                "company_terms": company_tokens.len(),
                "shared_terms": shared,
            }),
            started,
        ))
    }
}

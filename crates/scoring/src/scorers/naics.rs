//! Hierarchical NAICS code alignment.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;

use entities::{CompanyProfile, Opportunity};

use crate::context::ScoringContext;
use crate::text::{overlap_score, tokenize};
use crate::{ComponentResult, ComponentScorer, ScoreError};

/// Bonus applied when the company's primary code is the best match.
const PRIMARY_BONUS: f64 = 0.05;
/// Ceiling on the keyword-inference fallback when the notice has no NAICS.
const INFERENCE_CAP: f64 = 0.5;

/// Prefix-depth score for a pair of six-digit codes.
fn hierarchy_score(opp: &str, company: &str) -> f64 {
    if opp.len() < 2 || company.len() < 2 {
        return 0.0;
    }
    if opp == company {
        1.0
    } else if opp.len() >= 4 && company.len() >= 4 && opp[..4] == company[..4] {
        0.7
    } else if opp.len() >= 3 && company.len() >= 3 && opp[..3] == company[..3] {
        0.4
    } else if opp[..2] == company[..2] {
        0.2
    } else {
        0.0
    }
}

pub struct NaicsAlignment;

#[async_trait]
impl ComponentScorer for NaicsAlignment {
    fn name(&self) -> &'static str {
        "naics_alignment"
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

        if opportunity.naics_code.len() < 2 {
            // No code on the notice: infer industry fit from text, capped well
            // below what a real code match can reach.
            let opp_tokens = tokenize(&format!(
                "{} {}",
                opportunity.title, opportunity.description
            ));
            let company_tokens = tokenize(&company.capability_statement);
            let (overlap, _) = overlap_score(&opp_tokens, &company_tokens);
            let score = overlap.min(INFERENCE_CAP);
            return Ok(ComponentResult::ok(
                score,
                json!({ "method": "keyword_inference", "overlap": overlap }),
                started,
            ));
        }

        if company.naics_codes.is_empty() {
            return Ok(ComponentResult::ok(
                0.0,
                json!({ "method": "hierarchy", "reason": "no company NAICS codes" }),
                started,
            ));
        }

        let mut best = 0.0f64;
        let mut best_code = None;
        for code in &company.naics_codes {
            let score = hierarchy_score(&opportunity.naics_code, code);
            if score > best {
                best = score;
                best_code = Some(code.clone());
            }
        }

        let primary_is_best = best > 0.0
            && company
                .primary_naics()
                .map(|primary| hierarchy_score(&opportunity.naics_code, primary) >= best)
                .unwrap_or(false);
        let score = if primary_is_best {
            (best + PRIMARY_BONUS).min(1.0)
        } else {
            best
        };

        Ok(ComponentResult::ok(
            score,
            json!({
                "method": "hierarchy",
                "opportunity_naics": opportunity.naics_code,
                "best_match": best_code,
                "base_score": best,
                "primary_bonus": primary_is_best,
            }),
            started,
        ))
    }
}

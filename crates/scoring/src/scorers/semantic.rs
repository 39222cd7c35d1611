//! Embedding-based similarity between an opportunity and a capability
//! statement.
//!
//! Combines three signals over stored vectors: whole-document similarity,
//! the best-matching document chunk, and section-level similarities (title
//! and description against the company capability vector). This is the only
//! component that performs I/O; store faults degrade the component rather
//! than fail the evaluation.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use entities::{CompanyProfile, Embedding, Opportunity};

use crate::context::{keys, ScoringContext};
use crate::{ComponentResult, ComponentScorer, ScoreError};

const FULL_WEIGHT: f64 = 0.4;
const CHUNK_WEIGHT: f64 = 0.4;
const SECTION_WEIGHT: f64 = 0.2;

pub struct SemanticSimilarity;

impl SemanticSimilarity {
    /// Resolve a stored vector, falling back to the embedding service when
    /// configured. Embedding failures are logged and treated as a miss; the
    /// component reports `missing_embedding` instead of erroring.
    async fn resolve_vector(
        ctx: &ScoringContext,
        key: &str,
        fallback_text: &str,
    ) -> Result<Option<Embedding>, ScoreError> {
        if let Some(vector) = ctx.fetch_vector(key).await? {
            return Ok(Some(vector));
        }
        if fallback_text.trim().is_empty() {
            return Ok(None);
        }
        match ctx.embed_fallback(fallback_text).await {
            Ok(vector) => Ok(vector),
            Err(err) => {
                warn!(key, error = %err, "embedding fallback failed; treating vector as missing");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ComponentScorer for SemanticSimilarity {
    fn name(&self) -> &'static str {
        "semantic_similarity"
    }

    fn default_weight(&self) -> f64 {
        0.25
    }

    async fn score(
        &self,
        ctx: &ScoringContext,
        opportunity: &Opportunity,
        company: &CompanyProfile,
    ) -> Result<ComponentResult, ScoreError> {
        let started = Instant::now();

        let opp_text = format!("{} {}", opportunity.title, opportunity.description);
        let opp_full = match Self::resolve_vector(
            ctx,
            &keys::opp_full(&opportunity.notice_id),
            &opp_text,
        )
        .await
        {
            Ok(v) => v,
            Err(err) => {
                return Ok(ComponentResult::degraded(
                    0.0,
                    "vector_store_unavailable",
                    json!({ "error": err.to_string() }),
                    started,
                ))
            }
        };
        let company_full = match Self::resolve_vector(
            ctx,
            &keys::company_full(&company.company_id),
            &company.capability_statement,
        )
        .await
        {
            Ok(v) => v,
            Err(err) => {
                return Ok(ComponentResult::degraded(
                    0.0,
                    "vector_store_unavailable",
                    json!({ "error": err.to_string() }),
                    started,
                ))
            }
        };

        let opp_present = opp_full.is_some();
        let company_present = company_full.is_some();
        let (Some(opp_full), Some(company_full)) = (opp_full, company_full) else {
            return Ok(ComponentResult::missing_embedding(
                json!({
                    "opportunity_vector": opp_present,
                    "company_vector": company_present,
                }),
                started,
            ));
        };

        let full = f64::from(opp_full.cosine(&company_full));

        // Best-chunk similarity: probe chunk vectors in order until a gap.
        let mut best_chunk = None::<f64>;
        let mut chunk_count = 0usize;
        for index in 0..ctx.config.max_chunks {
            let key = keys::opp_chunk(&opportunity.notice_id, index);
            match ctx.fetch_vector(&key).await {
                Ok(Some(chunk)) => {
                    chunk_count += 1;
                    let sim = f64::from(chunk.cosine(&company_full));
                    best_chunk = Some(best_chunk.map_or(sim, |b: f64| b.max(sim)));
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(key, error = %err, "chunk vector read failed; stopping chunk probe");
                    break;
                }
            }
        }
        let best_chunk = best_chunk.unwrap_or(full);

        // Section similarities against the capability vector.
        let capability = match ctx
            .fetch_vector(&keys::company_capability(&company.company_id))
            .await
        {
            Ok(Some(v)) => v,
            _ => company_full.clone(),
        };
        let mut section_sims = Vec::new();
        for key in [
            keys::opp_title(&opportunity.notice_id),
            keys::opp_description(&opportunity.notice_id),
        ] {
            if let Ok(Some(section)) = ctx.fetch_vector(&key).await {
                section_sims.push(f64::from(section.cosine(&capability)));
            }
        }
        let section_mean = if section_sims.is_empty() {
            full
        } else {
            section_sims.iter().sum::<f64>() / section_sims.len() as f64
        };

        let score = FULL_WEIGHT * full + CHUNK_WEIGHT * best_chunk + SECTION_WEIGHT * section_mean;
        Ok(ComponentResult::ok(
            score,
            json!({
                "full_similarity": full,
                "best_chunk_similarity": best_chunk,
                "chunk_count": chunk_count,
                "section_mean": section_mean,
            }),
            started,
        ))
    }
}

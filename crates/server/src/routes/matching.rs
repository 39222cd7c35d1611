//! Synchronous match evaluation endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use engine::MatchRequest;
use entities::{CompanyProfile, MatchResult, Opportunity};
use store::{CompanyStore, MatchStore, OpportunityCatalog};

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;

/// Inline match request: both entities supplied in the body.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub opportunity: Opportunity,
    pub company_profile: CompanyProfile,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    #[serde(default)]
    pub weights_override: Option<BTreeMap<String, f64>>,
}

fn default_use_cache() -> bool {
    true
}

/// Evaluate one opportunity/company pair supplied inline.
pub async fn evaluate(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<EvaluateRequest>,
) -> ServerResult<Json<MatchResult>> {
    let request = MatchRequest {
        opportunity: request.opportunity,
        company_profile: request.company_profile,
        use_cache: request.use_cache,
        weights_override: request.weights_override,
    };
    let result = state.engine.evaluate(&request).await?;
    Ok(Json(result))
}

/// Match request addressed by stored ids.
#[derive(Debug, Deserialize)]
pub struct EvaluateByIdRequest {
    pub company_id: String,
    pub opportunity_id: String,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

/// Resolve both entities from the stores, then evaluate.
pub async fn evaluate_by_id(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<EvaluateByIdRequest>,
) -> ServerResult<Json<MatchResult>> {
    let opportunity = state
        .catalog
        .get(&request.opportunity_id)
        .await?
        .ok_or(ServerError::NotFound)?;
    let company = state
        .companies
        .get(&request.company_id)
        .await?
        .ok_or(ServerError::NotFound)?;

    let request = MatchRequest {
        opportunity,
        company_profile: company,
        use_cache: request.use_cache,
        weights_override: None,
    };
    let result = state.engine.evaluate(&request).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct TopMatchesQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    25
}

#[derive(Debug, Serialize)]
pub struct TopMatchesResponse {
    pub company_id: String,
    pub total: usize,
    pub matches: Vec<MatchResult>,
}

/// Top stored results for a company, best first.
pub async fn top_matches(
    State(state): State<Arc<ServerState>>,
    Path(company_id): Path<String>,
    Query(query): Query<TopMatchesQuery>,
) -> ServerResult<Json<TopMatchesResponse>> {
    let matches = state
        .matches
        .query(&company_id, query.limit.clamp(1, 500))
        .await?;
    Ok(Json(TopMatchesResponse {
        company_id,
        total: matches.len(),
        matches,
    }))
}

/// Purge cached results for a company after a profile edit.
pub async fn invalidate_company(
    State(state): State<Arc<ServerState>>,
    Path(company_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let invalidated = state.engine.invalidate_company(&company_id).await;
    Ok(Json(json!({
        "company_id": company_id,
        "invalidated": invalidated,
    })))
}

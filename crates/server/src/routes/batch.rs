//! Asynchronous batch job endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use batch::{BatchRequest, JobStatus};

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
}

/// Submit a batch scoring job. Returns immediately with the job id; progress
/// is polled via the job endpoints.
pub async fn submit(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<BatchRequest>,
) -> ServerResult<Json<SubmitResponse>> {
    let job_id = state.coordinator.submit(request).await?;
    Ok(Json(SubmitResponse { job_id }))
}

/// Job status: persisted record merged with live tracker counters.
pub async fn job_status(
    State(state): State<Arc<ServerState>>,
    Path(job_id): Path<String>,
) -> ServerResult<Json<JobStatus>> {
    let status = state.coordinator.status(&job_id).await?;
    Ok(Json(status))
}

/// Job health verdict from the progress tracker.
pub async fn job_health(
    State(state): State<Arc<ServerState>>,
    Path(job_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let health = state
        .coordinator
        .health(&job_id)
        .ok_or(ServerError::NotFound)?;
    Ok(Json(health))
}

/// Cancel a job. Remaining units drain as skipped; in-flight items finish.
pub async fn cancel_job(
    State(state): State<Arc<ServerState>>,
    Path(job_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let cancelled = state.coordinator.cancel(&job_id).await?;
    Ok(Json(json!({
        "job_id": job_id,
        "cancelled": cancelled,
    })))
}

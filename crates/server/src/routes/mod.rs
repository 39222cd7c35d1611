//! API route handlers
//!
//! Routes are organized by functionality:
//!
//! - `health`: Health checks, readiness, and metrics
//! - `matching`: Synchronous match evaluation and result retrieval
//! - `batch`: Asynchronous batch jobs (submit, status, health, cancel)
//! - `schedules`: Schedule CRUD and manual triggering

pub mod batch;
pub mod health;
pub mod matching;
pub mod schedules;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// Returns server information including version and available endpoints.
/// This is the root endpoint (GET /) and requires no authentication.
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "GovMatch Server",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/api/v1/match",
            "/api/v1/match/by-id",
            "/api/v1/matches/{company_id}",
            "/api/v1/companies/{company_id}/invalidate",
            "/api/v1/batch",
            "/api/v1/jobs/{job_id}",
            "/api/v1/jobs/{job_id}/health",
            "/api/v1/jobs/{job_id}/cancel",
            "/api/v1/schedules",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}

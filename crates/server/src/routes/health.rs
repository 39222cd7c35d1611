//! Liveness, readiness, and metrics endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::ServerResult;
use crate::state::ServerState;

/// Liveness probe: the process is up.
pub async fn health_check() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

/// Readiness probe: the matching stack is wired and can take traffic.
pub async fn readiness_check(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    // The engine is constructed at startup; being able to reach it through
    // state is the readiness signal for the in-process wiring.
    let scorers = state.engine.registry().len();
    Ok(Json(json!({
        "status": "ready",
        "scorers": scorers,
        "workers": state.config.worker_count,
    })))
}

/// Prometheus metrics render.
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let body = state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();
    Ok(body)
}

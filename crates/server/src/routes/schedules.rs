//! Schedule CRUD and manual trigger endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use entities::ScheduleEntry;

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;

/// Create or replace a schedule. The path segment is authoritative for the
/// name; a mismatched body name is rejected.
pub async fn upsert(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    Json(mut entry): Json<ScheduleEntry>,
) -> ServerResult<impl IntoResponse> {
    if !entry.name.is_empty() && entry.name != name {
        return Err(ServerError::BadRequest(format!(
            "schedule name mismatch: path {name:?}, body {:?}",
            entry.name
        )));
    }
    entry.name = name;
    state.schedules.upsert(entry.clone()).await?;
    Ok(Json(entry))
}

pub async fn get(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> ServerResult<Json<ScheduleEntry>> {
    let entry = state
        .schedules
        .get(&name)
        .await?
        .ok_or(ServerError::NotFound)?;
    Ok(Json(entry))
}

pub async fn list(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let entries = state.schedules.list().await?;
    Ok(Json(entries))
}

pub async fn delete(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let deleted = state.schedules.delete(&name).await?;
    if !deleted {
        return Err(ServerError::NotFound);
    }
    Ok(Json(json!({ "deleted": name })))
}

/// Fire a schedule immediately (still subject to the advisory lock).
pub async fn trigger(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let job_id = state.schedules.trigger(&name).await?;
    Ok(Json(json!({
        "schedule": name,
        "job_id": job_id,
    })))
}

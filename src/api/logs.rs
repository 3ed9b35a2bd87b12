//! Session log endpoints. Read-only; logs are written by the lifecycle
//! transitions and never through this surface.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};

use super::{ApiError, SharedState};
use crate::auth::Actor;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/logs", get(list_logs))
        .route("/api/logs/work-order/{work_order_id}", get(logs_by_work_order))
        .route("/api/logs/person/{person_id}", get(logs_by_person))
        .route("/api/logs/section/{section_id}", get(logs_by_section))
}

async fn list_logs(
    State(state): State<SharedState>,
    _actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let logs = state
        .db
        .call(move |db| db.list_logs())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(logs))
}

async fn logs_by_work_order(
    State(state): State<SharedState>,
    _actor: Actor,
    Path(work_order_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let logs = state
        .db
        .call(move |db| db.logs_by_work_order(&work_order_id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(logs))
}

async fn logs_by_person(
    State(state): State<SharedState>,
    _actor: Actor,
    Path(person_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let logs = state
        .db
        .call(move |db| db.logs_by_person(person_id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(logs))
}

async fn logs_by_section(
    State(state): State<SharedState>,
    _actor: Actor,
    Path(section_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let logs = state
        .db
        .call(move |db| db.logs_by_section(section_id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(logs))
}

//! Work assignment endpoints.
//!
//! Status and approval transitions take numeric codes in the route path
//! (the shop-floor clients bake them into fixed buttons); JSON bodies use
//! the snake_case string forms. Every successful mutation here publishes
//! one notification.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Deserialize;

use super::{ApiError, SharedState};
use crate::auth::Actor;
use crate::models::{ApprovalStatus, WorkStatus};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/assignments", get(list_assignments).post(create_assignment))
        .route("/api/assignments/pause-all", post(pause_all))
        .route("/api/assignments/resume-all", post(resume_all))
        .route(
            "/api/assignments/{id}",
            get(get_assignment)
                .put(update_assignment)
                .delete(delete_assignment),
        )
        .route(
            "/api/assignments/{work_order_id}/sections/{section_id}/status/{status}",
            put(update_status),
        )
        .route(
            "/api/assignments/approval/{id}/{status}/{notes}",
            put(update_approval),
        )
}

#[derive(Deserialize)]
pub struct CreateAssignmentRequest {
    pub work_order_id: String,
    pub section_id: i64,
    /// Defaults to the authenticated person.
    pub person_id: Option<i64>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateAssignmentRequest {
    pub work_order_id: String,
    pub section_id: i64,
    pub person_id: i64,
    pub status: WorkStatus,
    pub approval_status: ApprovalStatus,
    pub description: Option<String>,
    pub approval_notes: Option<String>,
}

fn status_icon(status: WorkStatus) -> &'static str {
    match status {
        WorkStatus::Pending => "clock",
        WorkStatus::Started => "play",
        WorkStatus::Completed => "check",
        WorkStatus::Paused => "pause",
    }
}

fn status_color(status: WorkStatus) -> &'static str {
    match status {
        WorkStatus::Pending => "gray",
        WorkStatus::Started => "green",
        WorkStatus::Completed => "blue",
        WorkStatus::Paused => "orange",
    }
}

/// Maps closure bail-outs to 404 and everything else to 500.
fn map_db_err(e: anyhow::Error) -> ApiError {
    let msg = e.to_string();
    if msg.contains("not found") {
        ApiError::NotFound(msg)
    } else {
        ApiError::Internal(msg)
    }
}

async fn list_assignments(
    State(state): State<SharedState>,
    _actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let assignments = state
        .db
        .call(move |db| db.list_assignments())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(assignments))
}

async fn get_assignment(
    State(state): State<SharedState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .db
        .call(move |db| db.get_assignment_detail(id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    match detail {
        Some(detail) => Ok(Json(detail)),
        None => Err(ApiError::NotFound(format!("Assignment {} not found", id))),
    }
}

async fn create_assignment(
    State(state): State<SharedState>,
    actor: Actor,
    Json(req): Json<CreateAssignmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.work_order_id.trim().is_empty() {
        return Err(ApiError::BadRequest("Work order id is required".to_string()));
    }
    let person_id = req.person_id.unwrap_or(actor.person_id);
    let assignment = state
        .db
        .call(move |db| {
            if db.get_section(req.section_id)?.is_none() {
                anyhow::bail!("Section {} not found", req.section_id);
            }
            if db.get_person(person_id)?.is_none() {
                anyhow::bail!("Person {} not found", person_id);
            }
            db.create_assignment(
                req.work_order_id.trim(),
                req.section_id,
                person_id,
                req.description.as_deref(),
            )
        })
        .await
        .map_err(map_db_err)?;
    state.notifier.notify(
        "Work order",
        "clipboard",
        &format!("{} was assigned", assignment.work_order_id),
        "blue",
    );
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn update_assignment(
    State(state): State<SharedState>,
    _actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAssignmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.work_order_id.trim().is_empty() {
        return Err(ApiError::BadRequest("Work order id is required".to_string()));
    }
    let assignment = state
        .db
        .call(move |db| {
            if db.get_section(req.section_id)?.is_none() {
                anyhow::bail!("Section {} not found", req.section_id);
            }
            if db.get_person(req.person_id)?.is_none() {
                anyhow::bail!("Person {} not found", req.person_id);
            }
            db.update_assignment(
                id,
                req.work_order_id.trim(),
                req.section_id,
                req.person_id,
                req.status,
                req.approval_status,
                req.description.as_deref(),
                req.approval_notes.as_deref(),
            )
        })
        .await
        .map_err(map_db_err)?;
    match assignment {
        Some(assignment) => {
            state.notifier.notify(
                "Work order",
                "clipboard",
                &format!("{} was updated", assignment.work_order_id),
                "blue",
            );
            Ok(Json(assignment))
        }
        None => Err(ApiError::NotFound(format!("Assignment {} not found", id))),
    }
}

async fn delete_assignment(
    State(state): State<SharedState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .db
        .call(move |db| {
            let existing = db.get_assignment(id)?;
            if existing.is_some() {
                db.delete_assignment(id)?;
            }
            Ok(existing)
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    match removed {
        Some(assignment) => {
            state.notifier.notify(
                "Work order",
                "trash",
                &format!("{} was removed", assignment.work_order_id),
                "red",
            );
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::NotFound(format!("Assignment {} not found", id))),
    }
}

async fn update_status(
    State(state): State<SharedState>,
    actor: Actor,
    Path((work_order_id, section_id, code)): Path<(String, i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let status = WorkStatus::from_code(code)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid status code: {}", code)))?;
    if work_order_id.trim().is_empty() {
        return Err(ApiError::BadRequest("Work order id is required".to_string()));
    }
    let wo = work_order_id.trim().to_string();
    let assignment = state
        .db
        .call(move |db| {
            if db.get_section(section_id)?.is_none() {
                anyhow::bail!("Section {} not found", section_id);
            }
            db.update_status(&wo, section_id, status, actor.person_id)
        })
        .await
        .map_err(map_db_err)?;
    state.notifier.notify(
        "Work order status",
        status_icon(status),
        &format!("{} is now {}", assignment.work_order_id, status),
        status_color(status),
    );
    Ok(Json(assignment))
}

async fn update_approval(
    State(state): State<SharedState>,
    _actor: Actor,
    Path((id, code, notes)): Path<(i64, i64, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let decision = ApprovalStatus::from_code(code)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid approval code: {}", code)))?;
    if decision == ApprovalStatus::Pending {
        return Err(ApiError::BadRequest(
            "Approval decision must be approved or rejected".to_string(),
        ));
    }
    let decision_notes = notes.clone();
    let assignment = state
        .db
        .call(move |db| db.update_approval(id, decision, &decision_notes))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    match assignment {
        Some(assignment) => {
            let (icon, color) = match decision {
                ApprovalStatus::Approved => ("check", "green"),
                _ => ("x", "red"),
            };
            state.notifier.notify(
                "Quality control",
                icon,
                &format!("{} was {}", assignment.work_order_id, decision),
                color,
            );
            Ok(Json(assignment))
        }
        None => Err(ApiError::NotFound(format!("Assignment {} not found", id))),
    }
}

async fn pause_all(
    State(state): State<SharedState>,
    _actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let affected = state
        .db
        .call(move |db| db.pause_all_except_completed())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    state.notifier.notify(
        "Production",
        "pause",
        &format!("{} work orders paused", affected),
        "orange",
    );
    Ok(Json(serde_json::json!({ "affected": affected })))
}

async fn resume_all(
    State(state): State<SharedState>,
    _actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let affected = state
        .db
        .call(move |db| db.resume_all_except_completed())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    state.notifier.notify(
        "Production",
        "play",
        &format!("{} work orders resumed", affected),
        "green",
    );
    Ok(Json(serde_json::json!({ "affected": affected })))
}

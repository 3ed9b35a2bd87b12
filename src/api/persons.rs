//! Person directory endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use super::{ApiError, SharedState};
use crate::auth::{Actor, hash_password};
use crate::models::PersonRole;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/persons", get(list_persons).post(create_person))
        .route("/api/persons/me", get(me))
        .route(
            "/api/persons/{id}",
            get(get_person).put(update_person).delete(delete_person),
        )
}

#[derive(Deserialize)]
pub struct PersonRequest {
    pub name: String,
    pub surname: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub section_id: Option<i64>,
    pub role: PersonRole,
    /// Required on create; on update, omitting it keeps the old password.
    pub password: Option<String>,
}

async fn list_persons(
    State(state): State<SharedState>,
    _actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let persons = state
        .db
        .call(move |db| db.list_persons())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(persons))
}

async fn get_person(
    State(state): State<SharedState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let info = state
        .db
        .call(move |db| db.get_person_info(id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    match info {
        Some(info) => Ok(Json(info)),
        None => Err(ApiError::NotFound(format!("Person {} not found", id))),
    }
}

/// The authenticated person, home section attached.
async fn me(
    State(state): State<SharedState>,
    actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let id = actor.person_id;
    let info = state
        .db
        .call(move |db| db.get_person_info(id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    match info {
        Some(info) => Ok(Json(info)),
        None => Err(ApiError::NotFound(format!("Person {} not found", id))),
    }
}

async fn create_person(
    State(state): State<SharedState>,
    _actor: Actor,
    Json(req): Json<PersonRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let password = match req.password.as_deref() {
        Some(p) if !p.is_empty() => p,
        _ => return Err(ApiError::BadRequest("Password is required".to_string())),
    };
    let hash = hash_password(password);

    let person = state
        .db
        .call(move |db| {
            if db.get_person_by_phone(&req.phone_number)?.is_some() {
                anyhow::bail!("Phone number {} is already registered", req.phone_number);
            }
            db.create_person(
                &req.name,
                &req.surname,
                &req.phone_number,
                req.email.as_deref(),
                req.section_id,
                req.role,
                &hash,
            )
        })
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("already registered") {
                ApiError::BadRequest(msg)
            } else {
                ApiError::Internal(msg)
            }
        })?;
    Ok((StatusCode::CREATED, Json(person)))
}

async fn update_person(
    State(state): State<SharedState>,
    _actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<PersonRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let hash = req
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(hash_password);

    let person = state
        .db
        .call(move |db| {
            if let Some(other) = db.get_person_by_phone(&req.phone_number)?
                && other.id != id
            {
                anyhow::bail!("Phone number {} is already registered", req.phone_number);
            }
            db.update_person(
                id,
                &req.name,
                &req.surname,
                &req.phone_number,
                req.email.as_deref(),
                req.section_id,
                req.role,
                hash.as_deref(),
            )
        })
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("already registered") {
                ApiError::BadRequest(msg)
            } else {
                ApiError::Internal(msg)
            }
        })?;
    match person {
        Some(person) => Ok(Json(person)),
        None => Err(ApiError::NotFound(format!("Person {} not found", id))),
    }
}

async fn delete_person(
    State(state): State<SharedState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .call(move |db| db.delete_person(id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Person {} not found", id)))
    }
}

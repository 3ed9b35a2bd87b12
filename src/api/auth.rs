//! Login and token refresh endpoints.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use super::{ApiError, SharedState};
use crate::auth;
use crate::errors::AuthError;
use crate::models::{Person, Section};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub phone_number: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub role: String,
    pub section: Option<Section>,
}

async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let phone = req.phone_number.trim().to_string();
    let person = state
        .db
        .call(move |db| db.get_person_by_phone(&phone))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or(AuthError::InvalidCredentials)?;

    if !auth::verify_password(&req.password, &person.hashed_password) {
        return Err(AuthError::InvalidCredentials.into());
    }

    issue_tokens(&state, person).await
}

async fn refresh(
    State(state): State<SharedState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    // The access token may be expired, but its signature must verify.
    let claims = auth::decode_expired_claims(&state.auth.token_secret, &req.access_token)?;

    let person = state
        .db
        .call(move |db| db.get_person(claims.sub))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or(AuthError::RefreshRejected)?;

    let stored_matches = person.refresh_token.as_deref() == Some(req.refresh_token.as_str());
    let still_live = person
        .refresh_token_expires_at
        .as_deref()
        .map(auth::refresh_token_live)
        .unwrap_or(false);
    if !stored_matches || !still_live {
        return Err(AuthError::RefreshRejected.into());
    }

    issue_tokens(&state, person).await
}

/// Sign a fresh access token and rotate the stored refresh token.
async fn issue_tokens(state: &SharedState, person: Person) -> Result<Json<TokenResponse>, ApiError> {
    let access_token = auth::issue_access_token(
        &state.auth.token_secret,
        &person,
        state.auth.access_token_minutes,
    )
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let refresh_token = auth::new_refresh_token();
    let expires_at = auth::refresh_expiry(state.auth.refresh_token_days);

    let person_id = person.id;
    let stored_token = refresh_token.clone();
    state
        .db
        .call(move |db| db.set_refresh_token(person_id, Some(&stored_token), Some(&expires_at)))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let section = match person.section_id {
        Some(section_id) => state
            .db
            .call(move |db| db.get_section(section_id))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?,
        None => None,
    };

    tracing::info!("Issued tokens for person {}", person.id);
    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
        role: person.role.as_str().to_string(),
        section,
    }))
}

//! HTTP boundary.
//!
//! Thin translation from requests to store calls: handlers validate enum
//! codes and auth, call into [`crate::db`], publish notification events on
//! success, and map errors onto `{"error": message}` JSON responses.

pub mod assignments;
pub mod auth;
pub mod excel;
pub mod logs;
pub mod notifications;
pub mod persons;
pub mod sections;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::config::AuthSettings;
use crate::db::DbHandle;
use crate::errors::{AuthError, ExcelError};
use crate::notify::Notifier;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub notifier: Notifier,
    pub auth: AuthSettings,
    pub uploads_dir: PathBuf,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

impl From<ExcelError> for ApiError {
    fn from(err: ExcelError) -> Self {
        let msg = err.to_string();
        match err {
            ExcelError::UnsupportedFormat { .. } | ExcelError::InvalidFileName { .. } => {
                ApiError::BadRequest(msg)
            }
            ExcelError::NoActiveFile | ExcelError::FileNotFound { .. } => ApiError::NotFound(msg),
            ExcelError::Workbook(_) | ExcelError::Io(_) => ApiError::Internal(msg),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .merge(auth::router())
        .merge(persons::router())
        .merge(sections::router())
        .merge(assignments::router())
        .merge(logs::router())
        .merge(excel::router())
        .merge(notifications::router())
        .route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "ok"
}

// ── Test helpers ──────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::db::TrackerDb;
    use crate::models::{Person, PersonRole, Section};
    use axum::body::Body;
    use http_body_util::BodyExt;

    pub fn test_state(uploads_dir: PathBuf) -> SharedState {
        let db = TrackerDb::new_in_memory().unwrap();
        Arc::new(AppState {
            db: DbHandle::new(db),
            notifier: Notifier::new(16),
            auth: AuthSettings {
                token_secret: "test-secret".to_string(),
                access_token_minutes: 60,
                refresh_token_days: 7,
            },
            uploads_dir,
        })
    }

    pub fn test_app(state: SharedState) -> Router {
        api_router().with_state(state)
    }

    pub async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Insert a worker with a known password and return it with a ready
    /// `Authorization` header value.
    pub async fn seed_actor(state: &SharedState) -> (Person, String) {
        let hash = crate::auth::hash_password("pw");
        let person = state
            .db
            .call(move |db| {
                db.create_person("Test", "Actor", "5550100", None, None, PersonRole::Worker, &hash)
            })
            .await
            .unwrap();
        let token =
            crate::auth::issue_access_token(&state.auth.token_secret, &person, 60).unwrap();
        (person, format!("Bearer {}", token))
    }

    pub async fn seed_section(state: &SharedState, name: &str) -> Section {
        let name = name.to_string();
        state
            .db
            .call(move |db| db.create_section(&name, None))
            .await
            .unwrap()
    }
}

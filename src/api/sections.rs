//! Factory section endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use super::{ApiError, SharedState};
use crate::auth::Actor;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/sections", get(list_sections).post(create_section))
        .route(
            "/api/sections/{id}",
            get(get_section).put(update_section).delete(delete_section),
        )
}

#[derive(Deserialize)]
pub struct SectionRequest {
    pub name: String,
    pub description: Option<String>,
}

async fn list_sections(
    State(state): State<SharedState>,
    _actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let sections = state
        .db
        .call(move |db| db.list_sections())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(sections))
}

async fn get_section(
    State(state): State<SharedState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let section = state
        .db
        .call(move |db| db.get_section(id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    match section {
        Some(section) => Ok(Json(section)),
        None => Err(ApiError::NotFound(format!("Section {} not found", id))),
    }
}

async fn create_section(
    State(state): State<SharedState>,
    _actor: Actor,
    Json(req): Json<SectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Section name is required".to_string()));
    }
    let section = state
        .db
        .call(move |db| db.create_section(req.name.trim(), req.description.as_deref()))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(section)))
}

async fn update_section(
    State(state): State<SharedState>,
    _actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<SectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Section name is required".to_string()));
    }
    let section = state
        .db
        .call(move |db| db.update_section(id, req.name.trim(), req.description.as_deref()))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    match section {
        Some(section) => Ok(Json(section)),
        None => Err(ApiError::NotFound(format!("Section {} not found", id))),
    }
}

async fn delete_section(
    State(state): State<SharedState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .call(move |db| db.delete_section(id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Section {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_section_crud() {
        let state = test_state(std::env::temp_dir());
        let (_, bearer) = seed_actor(&state).await;
        let app = test_app(state);

        let request = Request::builder()
            .method("POST")
            .uri("/api/sections")
            .header("Authorization", &bearer)
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"name": "Assembly", "description": "Final assembly line"})
                    .to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(created["name"], "Assembly");
        let id = created["id"].as_i64().unwrap();

        let request = Request::builder()
            .method("PUT")
            .uri(format!("/api/sections/{}", id))
            .header("Authorization", &bearer)
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"name": "Assembly B", "description": null}).to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(updated["name"], "Assembly B");
        assert!(updated["description"].is_null());

        let request = Request::builder()
            .method("GET")
            .uri("/api/sections")
            .header("Authorization", &bearer)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let listed: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(listed.len(), 1);

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/sections/{}", id))
            .header("Authorization", &bearer)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let request = Request::builder()
            .method("GET")
            .uri(format!("/api/sections/{}", id))
            .header("Authorization", &bearer)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_section_requires_name() {
        let state = test_state(std::env::temp_dir());
        let (_, bearer) = seed_actor(&state).await;
        let app = test_app(state);

        let request = Request::builder()
            .method("POST")
            .uri("/api/sections")
            .header("Authorization", &bearer)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({"name": "   "}).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_missing_section_not_found() {
        let state = test_state(std::env::temp_dir());
        let (_, bearer) = seed_actor(&state).await;
        let app = test_app(state);

        let request = Request::builder()
            .method("PUT")
            .uri("/api/sections/42")
            .header("Authorization", &bearer)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({"name": "Ghost"}).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

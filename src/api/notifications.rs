//! Manual notification broadcast.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use serde::Deserialize;

use super::{ApiError, SharedState};
use crate::auth::Actor;

pub fn router() -> Router<SharedState> {
    Router::new().route("/api/notifications/send", post(send_notification))
}

#[derive(Deserialize)]
pub struct SendNotificationRequest {
    pub title: String,
    pub icon: String,
    pub description: String,
    pub color: String,
}

/// Push an operator-authored event to every connected client. The server
/// stamps the time; delivery is fire-and-forget.
async fn send_notification(
    State(state): State<SharedState>,
    _actor: Actor,
    Json(req): Json<SendNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }
    state
        .notifier
        .notify(&req.title, &req.icon, &req.description, &req.color);
    Ok(Json(serde_json::json!({ "sent": true })))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_send_reaches_subscribers() {
        let state = test_state(std::env::temp_dir());
        let (_, bearer) = seed_actor(&state).await;
        let mut rx = state.notifier.subscribe();
        let app = test_app(state);

        let request = Request::builder()
            .method("POST")
            .uri("/api/notifications/send")
            .header("Authorization", &bearer)
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "title": "Shift change",
                    "icon": "bell",
                    "description": "Night shift starts in 15 minutes",
                    "color": "purple"
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let event: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(event["title"], "Shift change");
        assert_eq!(event["color"], "purple");
        assert!(event["time"].is_string());
    }

    #[tokio::test]
    async fn test_send_requires_title_and_token() {
        let state = test_state(std::env::temp_dir());
        let (_, bearer) = seed_actor(&state).await;
        let app = test_app(state);

        let body = serde_json::json!({
            "title": " ",
            "icon": "bell",
            "description": "d",
            "color": "c"
        })
        .to_string();

        let request = Request::builder()
            .method("POST")
            .uri("/api/notifications/send")
            .header("Authorization", &bearer)
            .header("content-type", "application/json")
            .body(Body::from(body.clone()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method("POST")
            .uri("/api/notifications/send")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

//! HTTP server assembly and lifecycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;

use crate::api::{self, AppState};
use crate::config::AppConfig;
use crate::db::{DbHandle, TrackerDb};
use crate::notify::Notifier;
use crate::ws;

/// Build the full application router: REST API plus the WebSocket push
/// channel. Clients are phones and shop-floor kiosks served from other
/// origins, so CORS stays permissive.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router()
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Open the database, assemble shared state and serve until Ctrl+C.
pub async fn start_server(config: &AppConfig) -> Result<()> {
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    let db_path = config.db_path();
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let db = TrackerDb::new(&db_path).context("Failed to initialize tracking database")?;

    let state = Arc::new(AppState {
        db: DbHandle::new(db),
        notifier: Notifier::new(config.channel_capacity()),
        auth: config.auth_settings(),
        uploads_dir: config.uploads_dir(),
    });
    let app = build_router(state);

    let addr = config.listen();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let local_addr = listener.local_addr()?;
    tracing::info!("Work-order tracker listening on http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    tracing::info!("Shutting down");
}

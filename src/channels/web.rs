//! Axum HTTP server for the health endpoint.
//!
//! A minimal liveness surface for deployment monitors: `GET /health`
//! reports process status and the registered-user count straight from the
//! store. Nothing else is exposed over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::Utc;

use crate::db::RecordStore;

/// Build the router serving `/health`.
pub fn router(store: Arc<dyn RecordStore>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(store)
}

/// Bind and serve until the process exits.
pub async fn serve(bind: SocketAddr, store: Arc<dyn RecordStore>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "Health endpoint listening");
    axum::serve(listener, router(store)).await
}

async fn health_handler(State(store): State<Arc<dyn RecordStore>>) -> impl IntoResponse {
    match store.profile_count().await {
        Ok(users) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "timestamp": Utc::now().to_rfc3339(),
                "users": users,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "timestamp": Utc::now().to_rfc3339(),
                    "error": e.to_string(),
                })),
            )
        }
    }
}

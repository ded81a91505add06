use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::api::AppState;

/// Welcome endpoint with API information
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Welcome to TasteTrail API",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health"
    }))
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Response {
    match state.cache.ping().await {
        Ok(()) => Json(json!({
            "status": "healthy",
            "timestamp": Utc::now(),
            "services": { "redis": "connected" }
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "services": { "redis": "disconnected" }
                })),
            )
                .into_response()
        }
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
///
/// `Upstream` deliberately carries no payload: provider status codes and
/// parse errors are logged where they occur, and the boundary always renders
/// the same opaque failure so no provider detail leaks to clients.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Qloo API failure")]
    Upstream,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            // Fixed external contract: upstream failures always render as
            // 502 {"error": "Qloo API failure"}.
            AppError::Upstream => (StatusCode::BAD_GATEWAY, "Qloo API failure".to_string()),
            AppError::Cancelled => (
                // 499: client closed request before the call resolved
                StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                "Request cancelled".to_string(),
            ),
            AppError::Cache(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_renders_fixed_payload() {
        let response = AppError::Upstream.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_input_is_bad_request() {
        let response =
            AppError::InvalidInput("filter.type is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_display_is_opaque() {
        assert_eq!(AppError::Upstream.to_string(), "Qloo API failure");
    }

    #[tokio::test]
    async fn test_upstream_body_is_fixed_payload() {
        let response = AppError::Upstream.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"error": "Qloo API failure"}));
    }
}

//! HTTP error mapping for the gateway.
//!
//! Every failure body carries `success: false` so clients can branch on the
//! same flag they use for tool failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use blockmesh_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Client sent something unusable (400).
    #[error("{0}")]
    BadRequest(String),

    /// blockMesh ran past its deadline (408).
    #[error("{tool} execution timed out")]
    Timeout { tool: String, seconds: u64 },

    /// Anything else (500).
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match &self {
            ApiError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "success": false }),
            ),
            ApiError::Timeout { seconds, .. } => (
                StatusCode::REQUEST_TIMEOUT,
                json!({
                    "error": message,
                    "success": false,
                    "output": format!("Process exceeded {seconds} second timeout"),
                }),
            ),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": message,
                    "success": false,
                    "output": format!("Internal server error: {message}"),
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Timeout { tool, timeout } => ApiError::Timeout {
                tool,
                seconds: timeout.as_secs(),
            },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

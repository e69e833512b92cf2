//! API Error Handling
//!
//! Errors the webhook endpoint reports back to the sender. Everything that
//! goes wrong after a delivery is accepted is logged, not returned.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// Signature missing or wrong
    Unauthorized,
    /// Delivery authentic, but no capacity to queue it
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::ServiceUnavailable(msg) => {
                tracing::warn!("Shedding delivery: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

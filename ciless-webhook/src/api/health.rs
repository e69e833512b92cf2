//! Liveness endpoint of the webhook bridge

use axum::{http::StatusCode, response::IntoResponse};

/// GET /health
///
/// Answers as long as the listener is up. Neither GitHub nor the cluster is
/// contacted, so an outage there never restarts the bridge.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

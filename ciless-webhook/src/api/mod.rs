//! API Module
//!
//! HTTP surface of the bridge: the webhook receiver and a liveness check.

pub mod error;
pub mod health;
pub mod webhook;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::service::dispatcher::Dispatcher;
use crate::service::signature::WebhookVerifier;

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<WebhookVerifier>,
    pub dispatcher: Dispatcher,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Webhook deliveries; the root path is what hooks point at by default
        .route("/", post(webhook::receive_webhook))
        .route("/webhook", post(webhook::receive_webhook))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

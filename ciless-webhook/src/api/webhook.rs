//! Webhook API Handler
//!
//! Verifies and decodes deliveries, then hands pull-request events to the
//! dispatcher. The response only reflects whether the delivery was
//! accepted; how reconciliation went is visible in the logs.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use ciless_core::domain::event::WebhookEvent;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::error::PipelineError;
use crate::service::dispatcher::{DispatchError, Job};
use crate::service::pipeline::report;
use crate::service::signature::SIGNATURE_HEADER;

/// Event kind header
pub const EVENT_HEADER: &str = "x-github-event";
/// Delivery id header
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// POST / and POST /webhook
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let delivery = header(&headers, DELIVERY_HEADER)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Err(e) = state.verifier.verify(header(&headers, SIGNATURE_HEADER), &body) {
        report(&delivery, &PipelineError::Authenticity(e));
        return Err(ApiError::Unauthorized);
    }

    let event = match decode_event(&headers, &body) {
        Ok(event) => event,
        Err(err) => {
            report(&delivery, &err);
            return Ok(ignored(&delivery));
        }
    };

    match event {
        WebhookEvent::PullRequest(event) => {
            info!(
                delivery,
                repo = %event.repo_slug,
                git_ref = %event.head_ref,
                action = %event.action,
                "Accepted pull request event"
            );

            let job = Job {
                delivery: delivery.clone(),
                event,
            };
            state
                .dispatcher
                .submit(job)
                .map_err(|e: DispatchError| {
                    ApiError::ServiceUnavailable(format!("delivery {delivery} dropped: {e}"))
                })?;

            Ok((
                StatusCode::ACCEPTED,
                Json(json!({ "status": "accepted", "delivery": delivery })),
            ))
        }
        WebhookEvent::Ping { zen } => {
            info!(delivery, zen = zen.as_deref().unwrap_or(""), "Received ping");
            Ok((
                StatusCode::OK,
                Json(json!({ "status": "pong", "delivery": delivery })),
            ))
        }
        WebhookEvent::Unsupported(kind) => {
            report(&delivery, &PipelineError::UnsupportedEvent(kind));
            Ok(ignored(&delivery))
        }
    }
}

/// Decode the delivery, treating anything undecodable as unsupported
fn decode_event(headers: &HeaderMap, body: &[u8]) -> Result<WebhookEvent, PipelineError> {
    let kind = header(headers, EVENT_HEADER)
        .ok_or_else(|| PipelineError::UnsupportedEvent("missing event header".to_string()))?;

    WebhookEvent::parse(kind, body).map_err(|e| PipelineError::UnsupportedEvent(e.to_string()))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn ignored(delivery: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ignored", "delivery": delivery })),
    )
}

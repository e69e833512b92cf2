//! Webhook event domain types

use serde::Serialize;
use thiserror::Error;

use crate::dto::github::{PingPayload, PullRequestPayload};

/// Event kind header value for pull-request events
pub const PULL_REQUEST_EVENT: &str = "pull_request";
/// Event kind header value for the hook configuration ping
pub const PING_EVENT: &str = "ping";

/// The part of a pull-request delivery the pipeline needs
///
/// Coordinates are taken from the head side of the pull request: the config
/// file that governs the build lives on the contributor's branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub repo_owner: String,
    pub repo_name: String,
    /// `owner/name` of the head repository
    pub repo_slug: String,
    pub head_ref: String,
    pub head_sha: String,
}

/// A decoded webhook delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    PullRequest(PullRequestEvent),
    Ping { zen: Option<String> },
    /// Any event kind the bridge does not act on
    Unsupported(String),
}

/// Why a delivery body could not be turned into an event
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed {kind} payload: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("pull request head has no repository")]
    MissingHeadRepository,
}

impl WebhookEvent {
    /// Decode a delivery from its event kind header and raw body
    ///
    /// Bodies of unsupported kinds are never parsed.
    pub fn parse(kind: &str, body: &[u8]) -> Result<Self, EventError> {
        match kind {
            PULL_REQUEST_EVENT => {
                let payload: PullRequestPayload =
                    serde_json::from_slice(body).map_err(|source| EventError::Malformed {
                        kind: kind.to_string(),
                        source,
                    })?;
                PullRequestEvent::try_from(payload).map(WebhookEvent::PullRequest)
            }
            PING_EVENT => {
                let payload: PingPayload =
                    serde_json::from_slice(body).map_err(|source| EventError::Malformed {
                        kind: kind.to_string(),
                        source,
                    })?;
                Ok(WebhookEvent::Ping { zen: payload.zen })
            }
            other => Ok(WebhookEvent::Unsupported(other.to_string())),
        }
    }
}

impl TryFrom<PullRequestPayload> for PullRequestEvent {
    type Error = EventError;

    fn try_from(payload: PullRequestPayload) -> Result<Self, Self::Error> {
        let head = payload.pull_request.head;
        let repo = head.repo.ok_or(EventError::MissingHeadRepository)?;

        Ok(Self {
            action: payload.action,
            repo_owner: repo.owner.login,
            repo_name: repo.name,
            repo_slug: repo.full_name,
            head_ref: head.git_ref,
            head_sha: head.sha,
        })
    }
}

//! Pipeline error taxonomy
//!
//! Every way a delivery can stop short of a reconciled template maps to one
//! [`PipelineError`] variant, and every variant to a [`PipelineErrorKind`]
//! that decides how loudly it is logged and whether anything is retried.

use ciless_core::decode::DecodeError;
use thiserror::Error;

use crate::service::signature::SignatureError;

/// Coarse classification of pipeline failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    /// Bad or missing signature; rejected, never retried
    Authenticity,
    /// Event kind or payload the bridge does not act on
    UnsupportedEvent,
    /// Repository has no config file at that ref; it opted out
    ConfigNotFound,
    /// Config file exists but is not a valid build spec
    ConfigDecode,
    /// Network, auth or deadline failure talking to a collaborator
    Transport,
    /// Reconciliation lost too many optimistic-concurrency races
    ConflictExhausted,
    /// Cluster refused the resource for a reason other than a conflict
    Rejected,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("webhook signature rejected: {0}")]
    Authenticity(#[from] SignatureError),

    #[error("unsupported event: {0}")]
    UnsupportedEvent(String),

    #[error("no config file in {repo} at {git_ref}")]
    ConfigNotFound { repo: String, git_ref: String },

    #[error("invalid config file: {0}")]
    ConfigDecode(#[from] DecodeError),

    #[error("{stage} failed: {message}")]
    Transport {
        stage: &'static str,
        message: String,
    },

    #[error("gave up on {name} after {attempts} conflicting attempt(s)")]
    ConflictExhausted { name: String, attempts: u32 },

    #[error("cluster rejected {name} (status {status}): {message}")]
    Rejected {
        name: String,
        status: u16,
        message: String,
    },
}

impl PipelineError {
    pub fn kind(&self) -> PipelineErrorKind {
        match self {
            PipelineError::Authenticity(_) => PipelineErrorKind::Authenticity,
            PipelineError::UnsupportedEvent(_) => PipelineErrorKind::UnsupportedEvent,
            PipelineError::ConfigNotFound { .. } => PipelineErrorKind::ConfigNotFound,
            PipelineError::ConfigDecode(_) => PipelineErrorKind::ConfigDecode,
            PipelineError::Transport { .. } => PipelineErrorKind::Transport,
            PipelineError::ConflictExhausted { .. } => PipelineErrorKind::ConflictExhausted,
            PipelineError::Rejected { .. } => PipelineErrorKind::Rejected,
        }
    }

    /// Short machine-readable reason, used as a log field
    pub fn reason(&self) -> &'static str {
        match self.kind() {
            PipelineErrorKind::Authenticity => "authenticity",
            PipelineErrorKind::UnsupportedEvent => "unsupported-event",
            PipelineErrorKind::ConfigNotFound => "config-not-found",
            PipelineErrorKind::ConfigDecode => "config-decode",
            PipelineErrorKind::Transport => "transport",
            PipelineErrorKind::ConflictExhausted => "conflict-exhausted",
            PipelineErrorKind::Rejected => "rejected",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

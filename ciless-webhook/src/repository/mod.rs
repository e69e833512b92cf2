//! Repository layer
//!
//! Repositories are the collaborator seam of the bridge: one reads config
//! files from source control, the other reads and writes build templates in
//! the cluster. They carry no business logic.
//!
//! All repositories are trait-based so the pipeline receives them as
//! injected capabilities; the in-memory implementations back the tests.

#[cfg(test)]
mod memory;
mod source;
mod templates;

use std::time::Duration;

use ciless_client::ClientError;
use thiserror::Error;

// Re-export traits
pub use source::ConfigSource;
pub use templates::TemplateRepository;

// Re-export implementations
#[cfg(test)]
pub use memory::{InMemoryTemplateRepository, StaticConfigSource};
pub use source::GitHubConfigSource;
pub use templates::ClusterTemplateRepository;

/// Outcome of a failed collaborator call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("resource version conflict")]
    Conflict,

    #[error("rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Transport(String),
}

impl From<ClientError> for RepositoryError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(_) => RepositoryError::NotFound,
            ClientError::AlreadyExists(_) => RepositoryError::AlreadyExists,
            ClientError::Conflict(_) => RepositoryError::Conflict,
            // Auth, throttling and request timeouts are operational, not a
            // verdict on the resource
            ClientError::ApiError { status, message }
                if (400..500).contains(&status) && !matches!(status, 401 | 403 | 408 | 429) =>
            {
                RepositoryError::Rejected { status, message }
            }
            other => RepositoryError::Transport(other.to_string()),
        }
    }
}

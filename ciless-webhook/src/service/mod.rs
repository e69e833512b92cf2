//! Service layer
//!
//! Business logic of the bridge. Each stage of the pipeline is its own
//! service and receives its collaborators through its constructor:
//! - `signature`: webhook authenticity
//! - `fetcher`: config file retrieval with bounded retry
//! - `reconciler`: create-or-update of the cluster template
//! - `pipeline`: fetch, decode, build and reconcile for one event
//! - `dispatcher`: keyed worker pool running pipelines off the request path

pub mod dispatcher;
pub mod fetcher;
pub mod pipeline;
pub mod reconciler;
pub mod signature;

use std::future::Future;
use std::time::Duration;

use crate::repository::RepositoryError;

// Re-export for convenience
pub use dispatcher::{DispatchError, Dispatcher, Job, WorkerPool};
pub use fetcher::{ConfigFetcher, FetchPolicy};
pub use pipeline::Pipeline;
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use signature::{SignatureError, WebhookVerifier};

/// Run a collaborator call under a deadline
///
/// Expiry surfaces as [`RepositoryError::Timeout`].
pub(crate) async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    tokio::time::timeout(deadline, call)
        .await
        .unwrap_or(Err(RepositoryError::Timeout(deadline)))
}

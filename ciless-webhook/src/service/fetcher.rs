//! Remote config fetcher
//!
//! Reads `.ciless.yaml` at the pull request's head ref. A missing file is a
//! normal outcome (the repository does not use the bridge) and is never
//! retried; transport failures are retried with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use ciless_core::decode::CONFIG_FILE_PATH;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::repository::{ConfigSource, RepositoryError};
use crate::service::with_deadline;

/// Retry and deadline settings for config reads
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Deadline for each individual read
    pub deadline: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            deadline: Duration::from_secs(10),
        }
    }
}

pub struct ConfigFetcher {
    source: Arc<dyn ConfigSource>,
    policy: FetchPolicy,
}

impl ConfigFetcher {
    pub fn new(source: Arc<dyn ConfigSource>, policy: FetchPolicy) -> Self {
        Self { source, policy }
    }

    /// Read the config file of `owner/repo` at `git_ref`
    pub async fn fetch(&self, owner: &str, repo: &str, git_ref: &str) -> Result<Vec<u8>> {
        let mut attempt = 0;
        let mut delay = self.policy.initial_backoff;

        loop {
            attempt += 1;

            let result = with_deadline(
                self.policy.deadline,
                self.source
                    .get_file_at_ref(owner, repo, CONFIG_FILE_PATH, git_ref),
            )
            .await;

            let err = match result {
                Ok(raw) => {
                    debug!(owner, repo, git_ref, bytes = raw.len(), "Fetched config file");
                    return Ok(raw);
                }
                Err(RepositoryError::NotFound) => {
                    return Err(PipelineError::ConfigNotFound {
                        repo: format!("{}/{}", owner, repo),
                        git_ref: git_ref.to_string(),
                    });
                }
                Err(err) => err,
            };

            let retryable = matches!(
                err,
                RepositoryError::Transport(_) | RepositoryError::Timeout(_)
            );
            if !retryable || attempt >= self.policy.attempts {
                return Err(PipelineError::Transport {
                    stage: "config fetch",
                    message: err.to_string(),
                });
            }

            warn!(
                owner,
                repo,
                git_ref,
                "Failed to fetch config file (attempt {}/{}): {}",
                attempt,
                self.policy.attempts,
                err
            );

            tokio::time::sleep(delay).await;

            // Exponential backoff with cap
            delay = (delay * 2).min(self.policy.max_backoff);
        }
    }
}

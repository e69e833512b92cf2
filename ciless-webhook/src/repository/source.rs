//! Config source repository
//!
//! Reads a single file at a ref from source control.

use async_trait::async_trait;
use ciless_client::GitHubClient;

use super::RepositoryError;

/// Repository trait for reading files from source control
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Reads `path` in `owner/repo` at `git_ref`
    ///
    /// Returns [`RepositoryError::NotFound`] when the file does not exist at
    /// that ref.
    async fn get_file_at_ref(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Vec<u8>, RepositoryError>;
}

/// Contents-API implementation of ConfigSource
pub struct GitHubConfigSource {
    client: GitHubClient,
}

impl GitHubConfigSource {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConfigSource for GitHubConfigSource {
    async fn get_file_at_ref(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Vec<u8>, RepositoryError> {
        Ok(self
            .client
            .get_file_at_ref(owner, repo, path, git_ref)
            .await?)
    }
}

//! Source-control contents API

use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};

use crate::error::Result;
use crate::{USER_AGENT, check_status, trim_base_url};

/// Media type asking the contents API for the raw file bytes
const RAW_CONTENT_TYPE: &str = "application/vnd.github.raw+json";

/// Client for the repository contents API
#[derive(Clone)]
pub struct GitHubClient {
    /// Base URL of the API (e.g., "https://api.github.com")
    base_url: String,
    /// Personal access token sent as a bearer token
    token: String,
    /// HTTP client instance
    client: Client,
}

impl GitHubClient {
    /// Create a new client with a default HTTP client
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(base_url, token, client))
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    /// The client should set a user agent.
    pub fn with_client(base_url: impl Into<String>, token: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            token: token.into(),
            client,
        }
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read a file at a given ref
    ///
    /// # Arguments
    /// * `owner` - Repository owner login
    /// * `repo` - Repository name
    /// * `path` - Path of the file inside the repository
    /// * `git_ref` - Branch, tag or commit to read the file at
    ///
    /// # Returns
    /// The raw file content, or [`crate::ClientError::NotFound`] when the file
    /// does not exist at that ref
    pub async fn get_file_at_ref(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Vec<u8>> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_url, owner, repo, path
        );
        tracing::debug!(%url, git_ref, "Fetching file");

        let response = self
            .client
            .get(&url)
            .query(&[("ref", git_ref)])
            .header(ACCEPT, RAW_CONTENT_TYPE)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?;

        let what = format!("{}/{}:{}@{}", owner, repo, path, git_ref);
        let response = check_status(response, &what).await?;

        Ok(response.bytes().await?.to_vec())
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

//! Source-control webhook payloads
//!
//! Only the fields the pipeline reads are modelled; everything else in the
//! payload is ignored during deserialization.

use serde::Deserialize;

/// Body of a `pull_request` event
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub action: String,
    pub pull_request: PullRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub head: PullRequestBranch,
}

/// Head branch of a pull request
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestBranch {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: String,
    /// Null when the fork the pull request came from has been deleted
    pub repo: Option<Repository>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// Body of the `ping` event sent when a webhook is first configured
#[derive(Debug, Clone, Deserialize)]
pub struct PingPayload {
    #[serde(default)]
    pub zen: Option<String>,
}

//! Server configuration
//!
//! Every setting can be passed as a flag or through the environment.
//! `Config` has no `Debug` impl since it holds secrets; log
//! [`Config::summary`] instead.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use ciless_core::template::DEFAULT_TEMPLATE_PREFIX;
use clap::{Parser, ValueEnum};

use crate::service::fetcher::FetchPolicy;

/// Service-account token mounted into every pod
pub const IN_CLUSTER_TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
/// CA bundle of the API server, mounted next to the token
pub const IN_CLUSTER_CA_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Clone)]
#[command(name = "ciless-webhook")]
#[command(about = "Turns pull request webhooks into Knative build templates", long_about = None)]
pub struct Config {
    /// Address the webhook server listens on
    #[arg(long, env = "CILESS_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// Token used to read config files from GitHub
    #[arg(long, env = "GITHUB_PERSONAL_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// Shared secret configured on the webhook
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: String,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// Cluster API server URL
    #[arg(long, env = "CLUSTER_API_URL", default_value = "https://kubernetes.default.svc")]
    pub cluster_url: String,

    /// File holding the cluster bearer token; the pod's service-account
    /// token is used when unset and present
    #[arg(long, env = "CLUSTER_TOKEN_FILE")]
    pub cluster_token_file: Option<PathBuf>,

    /// PEM bundle used to verify the cluster API server; the pod's
    /// service-account CA is used when unset and present
    #[arg(long, env = "CLUSTER_CA_FILE")]
    pub cluster_ca_file: Option<PathBuf>,

    /// Namespace build templates are written to
    #[arg(long, env = "CILESS_NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Prefix of every template name
    #[arg(long, env = "CILESS_TEMPLATE_PREFIX", default_value = DEFAULT_TEMPLATE_PREFIX)]
    pub template_prefix: String,

    /// Deadline for each call to GitHub or the cluster, in seconds
    #[arg(long, env = "CILESS_CALL_TIMEOUT_SECS", default_value_t = 10)]
    pub call_timeout_secs: u64,

    /// Number of workers processing events
    #[arg(long, env = "CILESS_WORKERS", default_value_t = 4)]
    pub workers: usize,

    /// Pending events each worker holds before deliveries are refused
    #[arg(long, env = "CILESS_QUEUE_DEPTH", default_value_t = 64)]
    pub queue_depth: usize,

    /// Attempts at reading a config file, including the first
    #[arg(long, env = "CILESS_FETCH_ATTEMPTS", default_value_t = 3)]
    pub fetch_attempts: u32,

    /// Attempts at updating a template before giving up on conflicts
    #[arg(long, env = "CILESS_MAX_UPDATE_ATTEMPTS", default_value_t = 3)]
    pub max_update_attempts: u32,

    /// Log output format
    #[arg(long, env = "CILESS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.webhook_secret.is_empty() {
            bail!("webhook secret must not be empty");
        }
        if self.github_token.is_empty() {
            bail!("GitHub token must not be empty");
        }

        for (name, url) in [
            ("GitHub API URL", &self.github_api_url),
            ("cluster URL", &self.cluster_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("{} must be an http(s) URL, got '{}'", name, url);
            }
        }

        if self.namespace.is_empty() {
            bail!("namespace must not be empty");
        }

        for (name, value) in [
            ("call timeout", self.call_timeout_secs),
            ("workers", self.workers as u64),
            ("queue depth", self.queue_depth as u64),
            ("fetch attempts", self.fetch_attempts as u64),
            ("max update attempts", self.max_update_attempts as u64),
        ] {
            if value == 0 {
                bail!("{} must be greater than zero", name);
            }
        }

        Ok(())
    }

    /// Token file to authenticate to the cluster with, if any
    pub fn cluster_token_path(&self) -> Option<PathBuf> {
        resolve_file(self.cluster_token_file.as_deref(), Path::new(IN_CLUSTER_TOKEN_FILE))
    }

    /// CA bundle to verify the cluster with, if any
    pub fn cluster_ca_path(&self) -> Option<PathBuf> {
        resolve_file(self.cluster_ca_file.as_deref(), Path::new(IN_CLUSTER_CA_FILE))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            attempts: self.fetch_attempts,
            deadline: self.call_timeout(),
            ..FetchPolicy::default()
        }
    }

    /// One-line description without secrets
    pub fn summary(&self) -> String {
        format!(
            "bind={} github={} cluster={} namespace={} prefix={} workers={} queue_depth={}",
            self.bind_addr,
            self.github_api_url,
            self.cluster_url,
            self.namespace,
            self.template_prefix,
            self.workers,
            self.queue_depth
        )
    }
}

/// An explicit path always wins, even if missing, so a typo fails loudly at
/// startup; the in-cluster fallback only applies when it exists
fn resolve_file(explicit: Option<&Path>, fallback: &Path) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None if fallback.is_file() => Some(fallback.to_path_buf()),
        None => None,
    }
}

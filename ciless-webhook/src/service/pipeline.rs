//! Pipeline Service
//!
//! Runs one pull-request event through fetch, decode, build and reconcile.
//! Each stage short-circuits the rest on failure; nothing is retried at
//! this level.

use ciless_core::decode::decode;
use ciless_core::domain::event::PullRequestEvent;
use ciless_core::template::TemplateBuilder;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::{PipelineError, PipelineErrorKind, Result};
use crate::service::dispatcher::Job;
use crate::service::fetcher::ConfigFetcher;
use crate::service::reconciler::{ReconcileOutcome, Reconciler};

pub struct Pipeline {
    fetcher: ConfigFetcher,
    builder: TemplateBuilder,
    reconciler: Reconciler,
}

impl Pipeline {
    pub fn new(fetcher: ConfigFetcher, builder: TemplateBuilder, reconciler: Reconciler) -> Self {
        Self {
            fetcher,
            builder,
            reconciler,
        }
    }

    pub fn builder(&self) -> &TemplateBuilder {
        &self.builder
    }

    /// Reconcile the build template for one event
    pub async fn run(&self, event: &PullRequestEvent) -> Result<ReconcileOutcome> {
        let raw = self
            .fetcher
            .fetch(&event.repo_owner, &event.repo_name, &event.head_ref)
            .await?;

        let spec = decode(&raw)?;
        debug!(steps = spec.len(), "Decoded build spec");

        let template = self.builder.build(&event.repo_slug, &event.head_ref, &spec);
        self.reconciler.reconcile(&template).await
    }

    /// Run a queued job and log how it ended
    pub async fn process(&self, job: &Job) {
        let span = info_span!(
            "delivery",
            id = %job.delivery,
            repo = %job.event.repo_slug,
            git_ref = %job.event.head_ref,
        );

        async {
            info!(action = %job.event.action, sha = %job.event.head_sha, "Handling pull request");

            match self.run(&job.event).await {
                Ok(outcome) => info!(%outcome, "Build template reconciled"),
                Err(err) => report(&job.delivery, &err),
            }
        }
        .instrument(span)
        .await
    }
}

/// Log a dropped delivery at the level its kind calls for
pub fn report(delivery: &str, err: &PipelineError) {
    let reason = err.reason();

    match err.kind() {
        PipelineErrorKind::UnsupportedEvent => {
            debug!(delivery, reason, "Ignoring delivery: {}", err)
        }
        PipelineErrorKind::ConfigNotFound => {
            info!(delivery, reason, "Repository has no build config, skipping: {}", err)
        }
        PipelineErrorKind::Authenticity | PipelineErrorKind::ConfigDecode => {
            warn!(delivery, reason, "Dropping delivery: {}", err)
        }
        PipelineErrorKind::Transport
        | PipelineErrorKind::ConflictExhausted
        | PipelineErrorKind::Rejected => {
            error!(delivery, reason, "Reconciliation failed: {}", err)
        }
    }
}

//! Template reconciler
//!
//! Makes the cluster's copy of a build template match the desired one.
//!
//! ```text
//! Lookup ──not found──▶ Create ──ok──────────────▶ Created
//!   │                     └──already exists──▶ Lookup (once)
//!   └──found──▶ Update (with stored resourceVersion) ──ok──▶ Updated
//!                 └──conflict──▶ Lookup (bounded)
//! ```
//!
//! Every write carries the resource version observed by the preceding
//! lookup, so a concurrent writer makes the write fail instead of being
//! silently overwritten. No other locking is involved.

use std::sync::Arc;
use std::time::Duration;

use ciless_core::domain::template::BuildTemplate;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::repository::{RepositoryError, TemplateRepository};
use crate::service::with_deadline;

/// Default cap on update attempts per reconciliation
pub const DEFAULT_MAX_UPDATE_ATTEMPTS: u32 = 3;

/// How a reconciliation finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The template did not exist and was created
    Created,
    /// The existing template was replaced on the first try
    Updated,
    /// The template was written after losing at least one race
    ConflictRetried { attempts: u32 },
}

impl std::fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileOutcome::Created => f.write_str("created"),
            ReconcileOutcome::Updated => f.write_str("updated"),
            ReconcileOutcome::ConflictRetried { attempts } => {
                write!(f, "updated after {} attempts", attempts)
            }
        }
    }
}

pub struct Reconciler {
    templates: Arc<dyn TemplateRepository>,
    deadline: Duration,
    max_update_attempts: u32,
}

impl Reconciler {
    pub fn new(
        templates: Arc<dyn TemplateRepository>,
        deadline: Duration,
        max_update_attempts: u32,
    ) -> Self {
        Self {
            templates,
            deadline,
            max_update_attempts: max_update_attempts.max(1),
        }
    }

    /// Create or update `desired` in the cluster
    pub async fn reconcile(&self, desired: &BuildTemplate) -> Result<ReconcileOutcome> {
        let name = desired.identity.as_str();
        let mut create_raced = false;
        let mut update_attempts = 0;

        loop {
            let existing = match with_deadline(self.deadline, self.templates.get(name)).await {
                Ok(existing) => Some(existing),
                Err(RepositoryError::NotFound) => None,
                Err(err) => return Err(failure(name, "template lookup", err)),
            };

            let Some(existing) = existing else {
                debug!(template = name, "Template not found, creating");

                match with_deadline(self.deadline, self.templates.create(desired)).await {
                    Ok(_) => {
                        info!(template = name, "Created build template");
                        return Ok(ReconcileOutcome::Created);
                    }
                    Err(RepositoryError::AlreadyExists) if !create_raced => {
                        warn!(template = name, "Template created concurrently, retrying as update");
                        create_raced = true;
                        continue;
                    }
                    Err(RepositoryError::AlreadyExists) => {
                        return Err(PipelineError::ConflictExhausted {
                            name: name.to_string(),
                            attempts: update_attempts + 1,
                        });
                    }
                    Err(err) => return Err(failure(name, "template create", err)),
                }
            };

            update_attempts += 1;
            let next = desired.with_resource_version(existing.metadata.resource_version);

            match with_deadline(self.deadline, self.templates.update(&next)).await {
                Ok(_) if update_attempts == 1 && !create_raced => {
                    info!(template = name, "Updated build template");
                    return Ok(ReconcileOutcome::Updated);
                }
                Ok(_) => {
                    info!(
                        template = name,
                        attempts = update_attempts,
                        "Updated build template after conflict"
                    );
                    return Ok(ReconcileOutcome::ConflictRetried {
                        attempts: update_attempts,
                    });
                }
                // Deleted between lookup and update: start over like a lost race
                Err(RepositoryError::Conflict) | Err(RepositoryError::NotFound) => {
                    if update_attempts >= self.max_update_attempts {
                        return Err(PipelineError::ConflictExhausted {
                            name: name.to_string(),
                            attempts: update_attempts,
                        });
                    }
                    warn!(
                        template = name,
                        "Stale resource version (attempt {}/{}), re-reading",
                        update_attempts,
                        self.max_update_attempts
                    );
                }
                Err(err) => return Err(failure(name, "template update", err)),
            }
        }
    }
}

fn failure(name: &str, stage: &'static str, err: RepositoryError) -> PipelineError {
    match err {
        RepositoryError::Rejected { status, message } => PipelineError::Rejected {
            name: name.to_string(),
            status,
            message,
        },
        other => PipelineError::Transport {
            stage,
            message: other.to_string(),
        },
    }
}

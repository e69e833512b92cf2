//! Ciless Webhook
//!
//! Receives pull request webhooks, reads the repository's `.ciless.yaml`
//! at the head ref and keeps a matching Knative build template in the
//! cluster.
//!
//! Architecture:
//! - API: HTTP surface (webhook receiver, health)
//! - Services: signature check, config fetch, reconciliation, dispatch
//! - Repositories: seams to GitHub and the cluster, plus in-memory stand-ins
//! - Config: flags and environment

pub mod api;
pub mod config;
pub mod error;
pub mod repository;
pub mod service;

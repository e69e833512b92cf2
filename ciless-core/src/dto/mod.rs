//! Data Transfer Objects
//!
//! Wire formats exchanged with the outside world: the repository's config
//! file, the source-control webhook payload and the cluster resource body.

pub mod cluster;
pub mod config;
pub mod github;

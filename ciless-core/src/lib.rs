//! ciless Core
//!
//! Core types and pure transformations for the ciless webhook bridge.
//!
//! This crate contains:
//! - Domain types: Build specs, pull-request events, build templates
//! - DTOs: Wire formats for the webhook payload, the repository config file
//!   and the cluster build-template resource
//! - The config decoder and the template builder

pub mod decode;
pub mod domain;
pub mod dto;
pub mod template;

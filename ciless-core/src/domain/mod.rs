//! Core domain types
//!
//! This module contains the structures the webhook pipeline passes between
//! its stages. They are produced fresh for every delivery and never mutated
//! once built.

pub mod build;
pub mod event;
pub mod template;

//! Shared test utilities for docdash integration tests.
//!
//! This module provides:
//! - `MockJobApi`, a scripted in-memory job backend with call counters
//! - Builders for jobs, files and configs
//! - Helpers for driving the paused tokio clock and draining notifications

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::*;

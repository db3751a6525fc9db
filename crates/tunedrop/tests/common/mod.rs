//! Shared test utilities for tunedrop integration tests.
//!
//! This module provides:
//! - In-memory fakes for the fetcher, search, object storage and catalog seams
//! - `TestHarness` wiring a real orchestrator, store and worker pool around them

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::TestHarness;

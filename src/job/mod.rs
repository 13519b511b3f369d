//! Per-job state
//!
//! A [`JobContext`] is created when a request is accepted and shared (behind an
//! `Arc`) between the orchestrator's polling loop and the background worker.

mod context;

pub use context::{JobContext, JobResult};

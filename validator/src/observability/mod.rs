//! Tracing and metrics plumbing.

pub mod metrics;
pub mod tracing;

//! Metrics collection abstraction for the deployment pipeline.
//!
//! Backends (prometheus, file dumps, etc) implement [`MetricsBackend`] and are injected
//! into the [`crate::Deployer`] and the remote client.
mod backend;
pub use backend::{MetricsBackend, MetricsHandle, StageOutcome};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}

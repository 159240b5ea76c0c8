use crate::metrics::backend::{MetricsBackend, StageOutcome};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_stage_started(&self, _: &str) {}

    #[inline(always)]
    fn record_stage_completed(&self, _: &str, _: StageOutcome, _: u64) {}

    #[inline(always)]
    fn record_resource_action(&self, _: &str, _: &str) {}

    #[inline(always)]
    fn record_remote_error(&self, _: &str, _: &str) {}
}

use std::sync::Arc;

/// Stage outcome for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Stage completed successfully.
    Success,
    /// Stage failed.
    Failure,
    /// Verification ran out of time without a verdict.
    Inconclusive,
    /// Run cancelled while the stage was in progress.
    Canceled,
}

impl StageOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            StageOutcome::Success => "success",
            StageOutcome::Failure => "failure",
            StageOutcome::Inconclusive => "inconclusive",
            StageOutcome::Canceled => "canceled",
        }
    }
}

/// Backend metrics collection interface.
///
/// Implementations are injected into [`crate::Deployer`] and shared by the reconcilers
/// and remote clients of one process.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record a pipeline stage start.
    ///
    /// # Arguments
    /// - `stage`: stage label (`volume`, `template`, `endpoint`, `verify`)
    fn record_stage_started(&self, stage: &str);
    /// Record a pipeline stage exit with outcome and duration.
    fn record_stage_completed(&self, stage: &str, outcome: StageOutcome, duration_ms: u64);
    /// Record what a reconciler did to a resource.
    ///
    /// # Arguments
    /// - `resource`: `volume`, `template` or `endpoint`
    /// - `action`: `created`, `updated`, `unchanged` or `reused`
    fn record_resource_action(&self, resource: &str, action: &str);
    /// Record a failed remote attempt, retried or not.
    ///
    /// # Arguments
    /// - `operation`: remote operation name
    /// - `error_kind`: `transient` or `permanent`
    fn record_remote_error(&self, operation: &str, error_kind: &str);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;

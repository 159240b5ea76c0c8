use std::sync::Arc;

use prometheus::{
    CounterVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder, proto::MetricFamily,
};

use gantry_core::metrics::{MetricsBackend, StageOutcome};

const NAMESPACE: &str = "gantry";

/// Prometheus implementation of [`MetricsBackend`].
///
/// ## Metrics
/// - `gantry_stages_started_total{stage}`
/// - `gantry_stages_completed_total{stage, outcome}`
/// - `gantry_stage_duration_seconds{stage}`
/// - `gantry_resource_actions_total{resource, action}`
/// - `gantry_remote_errors_total{operation, error_kind}`
///
/// Every label takes values from a small fixed set.
#[derive(Clone)]
pub struct PrometheusMetrics {
    stages_started: CounterVec,
    stages_completed: CounterVec,
    stage_duration: HistogramVec,
    resource_actions: CounterVec,
    remote_errors: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let stages_started = CounterVec::new(
            Opts::new("stages_started_total", "Pipeline stages started").namespace(NAMESPACE),
            &["stage"],
        )?;
        registry.register(Box::new(stages_started.clone()))?;

        let stages_completed = CounterVec::new(
            Opts::new("stages_completed_total", "Pipeline stages completed, by outcome")
                .namespace(NAMESPACE),
            &["stage", "outcome"],
        )?;
        registry.register(Box::new(stages_completed.clone()))?;

        // Verification waits on cold starts, so buckets reach the default deadline.
        let stage_duration = HistogramVec::new(
            HistogramOpts::new("stage_duration_seconds", "Pipeline stage duration in seconds")
                .namespace(NAMESPACE)
                .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
            &["stage"],
        )?;
        registry.register(Box::new(stage_duration.clone()))?;

        let resource_actions = CounterVec::new(
            Opts::new("resource_actions_total", "Reconciler actions per resource tier")
                .namespace(NAMESPACE),
            &["resource", "action"],
        )?;
        registry.register(Box::new(resource_actions.clone()))?;

        let remote_errors = CounterVec::new(
            Opts::new("remote_errors_total", "Failed remote call attempts").namespace(NAMESPACE),
            &["operation", "error_kind"],
        )?;
        registry.register(Box::new(remote_errors.clone()))?;

        Ok(Self {
            stages_started,
            stages_completed,
            stage_duration,
            resource_actions,
            remote_errors,
            registry,
        })
    }

    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render every family in the Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.gather())
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_stage_started(&self, stage: &str) {
        self.stages_started.with_label_values(&[stage]).inc();
    }

    fn record_stage_completed(&self, stage: &str, outcome: StageOutcome, duration_ms: u64) {
        self.stages_completed
            .with_label_values(&[stage, outcome.as_label()])
            .inc();
        self.stage_duration
            .with_label_values(&[stage])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_resource_action(&self, resource: &str, action: &str) {
        self.resource_actions
            .with_label_values(&[resource, action])
            .inc();
    }

    fn record_remote_error(&self, operation: &str, error_kind: &str) {
        self.remote_errors
            .with_label_values(&[operation, error_kind])
            .inc();
    }
}

//! Runs the reconcilers and the verifier in order for one environment.
//!
//! Stages are strictly sequential; each consumes the ids produced by the previous one
//! and a failure halts the run. Nothing is rolled back: a rerun finds and reuses what
//! an interrupted run left behind.
mod admission;
pub use admission::{AdmissionPermit, AdmissionTable};

mod outcome;
pub use outcome::{PipelineOutcome, PipelineReport, StageFailure, Verification};

mod stage;
pub use stage::Stage;

use std::{future::Future, sync::Arc};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use gantry_model::{AdmissionStrategy, DeployConfig};

use crate::{
    api::ResourceApi,
    error::CoreError,
    metrics::{MetricsHandle, StageOutcome, noop_metrics},
    reconcile::{EndpointReconciler, EndpointRequest, TemplateReconciler, VolumeReconciler},
    verify::Verifier,
};

/// Deployment pipeline entry point.
///
/// Cheap to clone; clones share the admission table, so runs for one environment are
/// serialized across all of them.
#[derive(Clone)]
pub struct Deployer {
    api: Arc<dyn ResourceApi>,
    metrics: MetricsHandle,
    admission: AdmissionStrategy,
    table: AdmissionTable,
}

impl Deployer {
    pub fn new(api: Arc<dyn ResourceApi>) -> Self {
        Self {
            api,
            metrics: noop_metrics(),
            admission: AdmissionStrategy::default(),
            table: AdmissionTable::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_admission(mut self, admission: AdmissionStrategy) -> Self {
        self.admission = admission;
        self
    }

    /// Converge `cfg`'s environment and verify it.
    ///
    /// `cancel` is checked between stages and while the verifier waits; remote calls
    /// already in flight complete.
    #[instrument(level = "info", skip_all, fields(env = %cfg.environment, workload = %cfg.workload))]
    pub async fn run(&self, cfg: &DeployConfig, cancel: &CancellationToken) -> PipelineOutcome {
        let outcome = match self.execute(cfg, cancel).await {
            Ok(outcome) => outcome,
            Err((stage, resource, err)) => PipelineOutcome::Failed(StageFailure {
                environment: cfg.environment.clone(),
                stage,
                resource,
                error: err.redacted(&cfg.env),
            }),
        };

        match &outcome {
            PipelineOutcome::Succeeded(_) => info!(outcome = outcome.as_label(), "pipeline finished"),
            PipelineOutcome::Inconclusive(_) => warn!(outcome = outcome.as_label(), "pipeline finished"),
            PipelineOutcome::Failed(f) => error!(
                outcome = outcome.as_label(),
                stage = %f.stage,
                kind = f.error.kind(),
                error = %f.error,
                "pipeline finished"
            ),
        }
        outcome
    }

    async fn execute(
        &self,
        cfg: &DeployConfig,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, (Stage, Option<String>, CoreError)> {
        let started = Instant::now();
        cfg.validate()
            .map_err(|e| (Stage::Prepare, None, CoreError::from(e)))?;

        let token = cancel.child_token();
        let _permit = self
            .table
            .admit(&cfg.environment, self.admission, &token)
            .await
            .map_err(|e| (Stage::Prepare, None, e))?;

        let volume_spec = cfg.volume_spec();
        let volume = self
            .stage(Stage::Volume, &token, {
                let rec = VolumeReconciler::new(self.api.clone(), self.metrics.clone());
                async move { rec.reconcile(&volume_spec).await }
            })
            .await
            .map_err(|e| (Stage::Volume, Some(cfg.environment.volume_name()), e))?;

        let template_spec = cfg.template_spec();
        let template_name = template_spec.name.clone();
        let template = self
            .stage(Stage::Template, &token, {
                let rec = TemplateReconciler::new(self.api.clone(), self.metrics.clone());
                async move { rec.reconcile(&template_spec).await }
            })
            .await
            .map_err(|e| (Stage::Template, Some(template_name), e))?;

        let endpoints = EndpointReconciler::new(self.api.clone(), self.metrics.clone());
        let request =
            EndpointRequest::for_deploy(cfg, &template.record.id).with_volume(&volume.record.id);
        let endpoint = self
            .stage(Stage::Endpoint, &token, endpoints.reconcile(&request))
            .await
            .map_err(|e| (Stage::Endpoint, Some(request.name.clone()), e))?;
        let endpoint_state = endpoints.observe(&endpoint.record.id).await;

        let verification = if cfg.verify.skip {
            debug!("verification disabled");
            Verification::Skipped
        } else {
            let verifier = Verifier::from_config(self.api.clone(), &cfg.verify);
            let res = self
                .stage(
                    Stage::Verify,
                    &token,
                    verifier.verify(&endpoint.record.id, &cfg.verify.probe, &token),
                )
                .await;
            match res {
                Ok(report) => Verification::Passed(report),
                Err(CoreError::VerificationTimeout {
                    job_id,
                    last_status,
                    waited_ms,
                }) => Verification::TimedOut {
                    job_id,
                    last_status,
                    waited_ms,
                },
                Err(e) => {
                    let resource = format!("{} ({})", endpoint.record.name, endpoint.record.id);
                    return Err((Stage::Verify, Some(resource), e));
                }
            }
        };

        let report = PipelineReport {
            environment: cfg.environment.clone(),
            image: cfg.image.clone(),
            volume,
            template,
            endpoint,
            endpoint_state,
            elapsed_ms: started.elapsed().as_millis() as u64,
            verification,
        };
        if matches!(report.verification, Verification::TimedOut { .. }) {
            Ok(PipelineOutcome::Inconclusive(report))
        } else {
            Ok(PipelineOutcome::Succeeded(report))
        }
    }

    /// Run one stage with metrics and a cancellation check at entry.
    async fn stage<T>(
        &self,
        stage: Stage,
        token: &CancellationToken,
        work: impl Future<Output = Result<T, CoreError>>,
    ) -> Result<T, CoreError> {
        self.metrics.record_stage_started(stage.as_str());
        let started = Instant::now();

        let res = if token.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            work.await
        };

        let outcome = match &res {
            Ok(_) => StageOutcome::Success,
            Err(CoreError::VerificationTimeout { .. }) => StageOutcome::Inconclusive,
            Err(CoreError::Cancelled) => StageOutcome::Canceled,
            Err(_) => StageOutcome::Failure,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.metrics
            .record_stage_completed(stage.as_str(), outcome, elapsed_ms);
        debug!(stage = %stage, outcome = outcome.as_label(), elapsed_ms, "stage finished");
        res
    }
}

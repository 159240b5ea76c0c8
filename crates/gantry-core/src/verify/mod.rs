//! Post-deploy smoke test of a live endpoint.
//!
//! A verification submits one [`WorkloadRequest`] and waits for a terminal verdict:
//!
//! ```text
//! submit sync ──terminal──────────────────────────────► evaluate
//!      │
//!      └─pending or transient error─► submit async ─► poll every interval ─► evaluate
//!                                        │
//!                                        └─ deadline ───► VerificationTimeout
//! ```
//!
//! Only a completed job whose output has the expected structure counts as a pass.
mod shape;

use std::{future::Future, sync::Arc, time::Duration};

use serde_json::Value;
use tokio::time::{Instant, sleep_until, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use gantry_model::{Job, JobStatus, SubmitMode, VerifyConfig, WorkloadRequest};

use crate::{
    api::{ApiResult, ResourceApi},
    error::CoreError,
};

/// What a passing job proved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    /// Device names from a diagnostic run.
    Devices(Vec<String>),
    /// Entry counts from a directory listing.
    Listing { files: usize, directories: usize },
}

/// Successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub job_id: String,
    /// Submission mode that produced the verdict.
    pub mode: SubmitMode,
    pub evidence: Evidence,
    pub elapsed_ms: u64,
}

/// Runs smoke tests against deployed endpoints.
#[derive(Clone)]
pub struct Verifier {
    api: Arc<dyn ResourceApi>,
    poll_interval: Duration,
    deadline: Duration,
}

impl Verifier {
    pub fn new(api: Arc<dyn ResourceApi>) -> Self {
        Self::from_config(api, &VerifyConfig::default())
    }

    pub fn from_config(api: Arc<dyn ResourceApi>, cfg: &VerifyConfig) -> Self {
        Self {
            api,
            poll_interval: Duration::from_millis(cfg.poll_interval_ms),
            deadline: Duration::from_millis(cfg.deadline_ms),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Submit `request` to `endpoint_id` and judge the result.
    ///
    /// Cancellation is honored between remote calls and while waiting to poll; a call
    /// already in flight is allowed to finish.
    #[instrument(level = "debug", skip(self, request, cancel), fields(endpoint = endpoint_id, probe = request.kind()))]
    pub async fn verify(
        &self,
        endpoint_id: &str,
        request: &WorkloadRequest,
        cancel: &CancellationToken,
    ) -> Result<VerifyReport, CoreError> {
        let mut clock = Clock::start(self.deadline);
        let payload = request.payload();

        match clock
            .bounded(self.submit(endpoint_id, &payload, SubmitMode::Sync))
            .await
        {
            Ok(job) => {
                clock.observe(&job);
                if job.status.is_terminal() {
                    return evaluate(job, request, SubmitMode::Sync, &clock);
                }
                debug!(status = %job.status, "sync submission returned before completion; polling an async job");
            }
            // A sync call that timed out or dropped says nothing about the job.
            Err(CoreError::Remote(e)) if e.is_transient() => {
                warn!(error = %e, "sync submission did not answer; polling an async job");
            }
            Err(e) => return Err(e),
        }
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        let job = clock
            .bounded(self.submit(endpoint_id, &payload, SubmitMode::Async))
            .await?;
        clock.observe(&job);
        if job.status.is_terminal() {
            return evaluate(job, request, SubmitMode::Async, &clock);
        }

        loop {
            let now = Instant::now();
            if now >= clock.deadline {
                return Err(clock.timed_out());
            }
            let wake = (now + self.poll_interval).min(clock.deadline);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CoreError::Cancelled),
                _ = sleep_until(wake) => {}
            }
            if Instant::now() >= clock.deadline {
                return Err(clock.timed_out());
            }

            let job_id = clock.job_id.clone().unwrap_or_default();
            let job = clock.bounded(self.api.job_status(endpoint_id, &job_id)).await?;
            if job.status != clock.last_status {
                debug!(job = %job.id, from = %clock.last_status, to = %job.status, "job status changed");
            }
            clock.observe(&job);
            if job.status.is_terminal() {
                return evaluate(job, request, SubmitMode::Async, &clock);
            }
        }
    }

    async fn submit(&self, endpoint_id: &str, payload: &Value, mode: SubmitMode) -> ApiResult<Job> {
        let job = self.api.submit_job(endpoint_id, payload, mode).await?;
        debug!(job = %job.id, mode = mode.as_str(), status = %job.status, "job submitted");
        Ok(job)
    }
}

/// Deadline bookkeeping for one verification.
struct Clock {
    started: Instant,
    deadline: Instant,
    job_id: Option<String>,
    last_status: JobStatus,
}

impl Clock {
    fn start(budget: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started + budget,
            job_id: None,
            last_status: JobStatus::Queued,
        }
    }

    fn observe(&mut self, job: &Job) {
        self.job_id = Some(job.id.clone());
        self.last_status = job.status;
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn timed_out(&self) -> CoreError {
        CoreError::VerificationTimeout {
            job_id: self.job_id.clone(),
            last_status: self.last_status,
            waited_ms: self.elapsed_ms(),
        }
    }

    /// Run a remote call, giving up when the deadline passes first.
    async fn bounded<T>(&self, call: impl Future<Output = ApiResult<T>>) -> Result<T, CoreError> {
        match timeout_at(self.deadline, call).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(self.timed_out()),
        }
    }
}

fn evaluate(
    job: Job,
    request: &WorkloadRequest,
    mode: SubmitMode,
    clock: &Clock,
) -> Result<VerifyReport, CoreError> {
    let failed = |why: String| CoreError::VerificationFailed(format!("job {}: {why}", job.id));

    if job.status.is_failure() {
        let reason = job
            .error_message()
            .unwrap_or_else(|| "no error reported".to_string());
        return Err(failed(format!("ended {}: {reason}", job.status)));
    }
    if let Some(err) = job.error_message() {
        return Err(failed(format!("completed with error: {err}")));
    }
    let output = match &job.output {
        Some(v @ Value::Object(_)) => v,
        _ => return Err(failed("completed without an output object".into())),
    };
    if let Some(err) = shape::reported_error(output) {
        return Err(failed(format!("workload reported an error: {err}")));
    }

    let evidence = match request {
        WorkloadRequest::Diagnose => {
            let names = shape::device_names(output);
            if names.is_empty() {
                return Err(failed("diagnostic output names no compute device".into()));
            }
            Evidence::Devices(names)
        }
        WorkloadRequest::ListFiles { path } => {
            let (files, directories) = shape::listing(output)
                .map_err(|e| failed(format!("listing of {path} failed: {e}")))?;
            Evidence::Listing { files, directories }
        }
    };

    let elapsed_ms = clock.elapsed_ms();
    info!(job = %job.id, mode = mode.as_str(), elapsed_ms, evidence = ?evidence, "verification passed");
    Ok(VerifyReport {
        job_id: job.id,
        mode,
        evidence,
        elapsed_ms,
    })
}

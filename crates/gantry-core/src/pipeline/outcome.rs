use std::fmt;

use gantry_model::{Endpoint, EndpointState, Environment, JobStatus, Template, Volume};

use crate::{
    error::CoreError,
    pipeline::Stage,
    reconcile::Reconciled,
    verify::{Evidence, VerifyReport},
};

/// Final result of one pipeline run. Exactly one per run.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// All three resources converged and verification passed or was skipped.
    Succeeded(PipelineReport),
    /// A stage failed; later stages did not run.
    Failed(StageFailure),
    /// Resources converged but the test job never reached a terminal status.
    Inconclusive(PipelineReport),
}

impl PipelineOutcome {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Succeeded(_))
    }

    pub fn environment(&self) -> &Environment {
        match self {
            PipelineOutcome::Succeeded(r) | PipelineOutcome::Inconclusive(r) => &r.environment,
            PipelineOutcome::Failed(f) => &f.environment,
        }
    }

    /// Return label value for metrics and logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            PipelineOutcome::Succeeded(_) => "succeeded",
            PipelineOutcome::Failed(_) => "failed",
            PipelineOutcome::Inconclusive(_) => "inconclusive",
        }
    }
}

/// Verification part of a report.
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    Passed(VerifyReport),
    /// Disabled by configuration.
    Skipped,
    /// Deadline elapsed before a terminal status.
    TimedOut {
        job_id: Option<String>,
        last_status: JobStatus,
        waited_ms: u64,
    },
}

/// Converged resources of a run that got past the endpoint stage.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub environment: Environment,
    pub image: String,
    pub volume: Reconciled<Volume>,
    pub template: Reconciled<Template>,
    pub endpoint: Reconciled<Endpoint>,
    /// Health sampled right after the endpoint stage, when available.
    pub endpoint_state: Option<EndpointState>,
    pub verification: Verification,
    pub elapsed_ms: u64,
}

/// The stage that stopped a run, and why.
///
/// `error` has every injected value masked.
#[derive(Debug)]
pub struct StageFailure {
    pub environment: Environment,
    pub stage: Stage,
    /// Name or `name (id)` of the resource involved, when known.
    pub resource: Option<String>,
    pub error: CoreError,
}

impl fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineOutcome::Succeeded(r) => write!(f, "SUCCESS {r}"),
            PipelineOutcome::Inconclusive(r) => write!(f, "INCONCLUSIVE {r}"),
            PipelineOutcome::Failed(e) => write!(f, "FAILURE {e}"),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] stage '{}' failed", self.environment, self.stage)?;
        if let Some(resource) = &self.resource {
            write!(f, " on {resource}")?;
        }
        write!(f, ": {}", self.error)
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{}] {} in {}ms",
            self.environment, self.image, self.elapsed_ms
        )?;

        let v = &self.volume;
        writeln!(
            f,
            "  volume   {} ({}) {}, zone {}",
            v.record.name, v.record.id, v.action, v.record.zone
        )?;
        let t = &self.template;
        writeln!(f, "  template {} ({}) {}", t.record.name, t.record.id, t.action)?;
        let e = &self.endpoint;
        write!(f, "  endpoint {} ({}) {}", e.record.name, e.record.id, e.action)?;
        if let Some(state) = self.endpoint_state {
            write!(f, ", {state}")?;
        }
        writeln!(f)?;

        match &self.verification {
            Verification::Passed(r) => {
                write!(
                    f,
                    "  verify   passed via {} job {} in {}ms",
                    r.mode.as_str(),
                    r.job_id,
                    r.elapsed_ms
                )?;
                match &r.evidence {
                    Evidence::Devices(names) => write!(f, ", devices: {}", names.join(", ")),
                    Evidence::Listing { files, directories } => {
                        write!(f, ", {files} files, {directories} directories")
                    }
                }
            }
            Verification::Skipped => write!(f, "  verify   skipped"),
            Verification::TimedOut {
                job_id,
                last_status,
                waited_ms,
            } => write!(
                f,
                "  verify   no verdict after {}ms, job {} last seen {}",
                waited_ms,
                job_id.as_deref().unwrap_or("-"),
                last_status
            ),
        }
    }
}

use thiserror::Error;

use gantry_model::{Env, JobStatus, ModelError};

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid deploy config: {0}")]
    Config(#[from] ModelError),

    #[error("remote error: {0}")]
    Remote(#[from] ApiError),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("verification inconclusive after {waited_ms}ms: last status {last_status}")]
    VerificationTimeout {
        job_id: Option<String>,
        last_status: JobStatus,
        waited_ms: u64,
    },

    #[error("pipeline run cancelled")]
    Cancelled,

    #[error("environment '{0}' already has a pipeline run in flight")]
    Busy(String),
}

impl CoreError {
    /// Return label value for metrics and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Config(_) => "config",
            CoreError::Remote(_) => "remote",
            CoreError::InvariantViolation(_) => "invariant_violation",
            CoreError::VerificationFailed(_) => "verification_failed",
            CoreError::VerificationTimeout { .. } => "verification_timeout",
            CoreError::Cancelled => "cancelled",
            CoreError::Busy(_) => "busy",
        }
    }

    /// Replace every injected value occurring in the error text with a mask.
    ///
    /// Remote services may echo request bodies in their error messages.
    pub fn redacted(self, env: &Env) -> Self {
        match self {
            CoreError::Remote(e) => CoreError::Remote(e.map_message(|m| env.redact(m))),
            CoreError::InvariantViolation(m) => CoreError::InvariantViolation(env.redact(&m)),
            CoreError::VerificationFailed(m) => CoreError::VerificationFailed(env.redact(&m)),
            other => other,
        }
    }
}

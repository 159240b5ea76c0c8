use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Defines how a pipeline run is admitted when the same environment already has one in flight.
///
/// Two concurrent runs for the same environment can race a create and produce duplicate
/// resources, so runs are serialized per environment. Runs for different environments never
/// wait on each other.
///
/// Strategies:
/// - `Queue`: Wait for the running pipeline to finish, then run.
/// - `DropIfRunning`: Refuse immediately with a busy failure.
/// - `Replace`: Cancel the running pipeline (it stops at the next stage boundary), then run.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdmissionStrategy {
    /// Wait for the in-flight run of the same environment.
    #[default]
    Queue,
    /// Refuse while a run of the same environment is in flight.
    DropIfRunning,
    /// Cancel the in-flight run and take its place.
    Replace,
}

impl FromStr for AdmissionStrategy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop-if-running" | "drop" => Ok(AdmissionStrategy::DropIfRunning),
            "queue" | "wait" | "" => Ok(AdmissionStrategy::Queue),
            "replace" => Ok(AdmissionStrategy::Replace),
            other => Err(ModelError::UnknownAdmission(other.to_string())),
        }
    }
}

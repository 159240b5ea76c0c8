use std::fmt;

use serde::{Deserialize, Serialize};

/// Readiness of an endpoint, observed by polling and never set by the pipeline.
///
/// `Provisioning -> {Idle, Active} -> Provisioning (on update) -> Deleted`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndpointState {
    Provisioning,
    Idle,
    Active,
    Deleted,
}

impl EndpointState {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointState::Provisioning => "provisioning",
            EndpointState::Idle => "idle",
            EndpointState::Active => "active",
            EndpointState::Deleted => "deleted",
        }
    }
}

impl fmt::Display for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Worker counters from the endpoint health report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerCounts {
    pub idle: u32,
    pub initializing: u32,
    pub ready: u32,
    pub running: u32,
    pub throttled: u32,
    pub unhealthy: u32,
}

/// Job counters from the endpoint health report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobCounts {
    pub completed: u64,
    pub failed: u64,
    pub in_progress: u64,
    pub in_queue: u64,
    pub retried: u64,
}

/// Endpoint health report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointHealth {
    pub workers: WorkerCounts,
    pub jobs: JobCounts,
}

impl EndpointHealth {
    /// Derive the readiness state from worker counters.
    pub fn state(&self) -> EndpointState {
        let w = &self.workers;
        if w.running > 0 {
            EndpointState::Active
        } else if w.ready > 0 || w.idle > 0 {
            EndpointState::Idle
        } else {
            EndpointState::Provisioning
        }
    }
}

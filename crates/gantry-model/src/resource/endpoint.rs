use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    domain::{ResourceId, Zone},
    error::{ModelError, ModelResult},
};

/// Autoscaling signal used by the endpoint.
///
/// - `QueueDelay`: add workers when requests wait longer than `value` seconds.
/// - `RequestCount`: target `value` queued requests per worker.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScalerKind {
    #[default]
    QueueDelay,
    RequestCount,
}

impl FromStr for ScalerKind {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "queue-delay" | "delay" => Ok(ScalerKind::QueueDelay),
            "request-count" | "count" => Ok(ScalerKind::RequestCount),
            other => Err(ModelError::UnknownScaler(other.to_string())),
        }
    }
}

/// Desired compute endpoint, as sent on create and update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSpec {
    pub name: String,
    pub template_id: ResourceId,
    /// Bound persistent volume. The endpoint zone is pinned to its zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_volume_id: Option<ResourceId>,
    /// Placement zones; exactly the volume's zone when a volume is attached.
    #[serde(default)]
    pub data_center_ids: Vec<Zone>,
    pub workers_min: u32,
    pub workers_max: u32,
    /// Idle seconds before a worker scales down.
    pub idle_timeout: u32,
    pub execution_timeout_ms: u64,
    pub scaler_type: ScalerKind,
    pub scaler_value: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpu_type_ids: Vec<String>,
}

/// Compute endpoint as reported by the control plane.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub id: ResourceId,
    pub name: String,
    pub template_id: ResourceId,
    #[serde(default)]
    pub network_volume_id: Option<ResourceId>,
    #[serde(default)]
    pub data_center_ids: Vec<Zone>,
    #[serde(default)]
    pub workers_min: u32,
    #[serde(default)]
    pub workers_max: u32,
    #[serde(default)]
    pub idle_timeout: u32,
    #[serde(default)]
    pub execution_timeout_ms: u64,
    #[serde(default)]
    pub scaler_type: ScalerKind,
    #[serde(default)]
    pub scaler_value: u32,
    #[serde(default)]
    pub gpu_type_ids: Vec<String>,
}

impl Endpoint {
    /// Primary placement zone, if any.
    pub fn zone(&self) -> Option<&str> {
        self.data_center_ids.first().map(|z| z.as_str())
    }
}

impl EndpointSpec {
    /// Returns `true` if `existing` already carries every field of this spec.
    pub fn matches(&self, existing: &Endpoint) -> bool {
        existing.name == self.name
            && existing.template_id == self.template_id
            && existing.network_volume_id == self.network_volume_id
            && existing.data_center_ids == self.data_center_ids
            && existing.workers_min == self.workers_min
            && existing.workers_max == self.workers_max
            && existing.idle_timeout == self.idle_timeout
            && existing.execution_timeout_ms == self.execution_timeout_ms
            && existing.scaler_type == self.scaler_type
            && existing.scaler_value == self.scaler_value
            && existing.gpu_type_ids == self.gpu_type_ids
    }
}

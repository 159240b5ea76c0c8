use serde::{Deserialize, Serialize};

use crate::domain::{Env, ResourceId};

/// Desired container template, as sent on create and update.
///
/// The persistent volume id is deliberately absent: network volumes bind at
/// the endpoint level. `volume_in_gb`/`volume_mount_path` only describe the
/// mount inside the container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSpec {
    /// Deterministic name (`{workload}-{env}`).
    pub name: String,
    /// Immutable image reference (registry path + tag or digest).
    pub image_name: String,
    /// Ephemeral container disk in GB.
    pub container_disk_in_gb: u32,
    /// Persistent mount size in GB.
    pub volume_in_gb: u32,
    /// Persistent mount path inside the container.
    pub volume_mount_path: String,
    /// Injected variables. Opaque: never inspected or logged.
    #[serde(default)]
    pub env: Env,
    /// Serverless templates are the only kind this pipeline manages.
    #[serde(default = "serverless")]
    pub is_serverless: bool,
}

fn serverless() -> bool {
    true
}

/// Container template as reported by the control plane.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: ResourceId,
    pub name: String,
    pub image_name: String,
    #[serde(default)]
    pub container_disk_in_gb: u32,
    #[serde(default)]
    pub volume_in_gb: u32,
    #[serde(default)]
    pub volume_mount_path: String,
    #[serde(default)]
    pub env: Env,
}

impl TemplateSpec {
    /// Returns `true` if `existing` already carries every field of this spec.
    pub fn matches(&self, existing: &Template) -> bool {
        existing.name == self.name
            && existing.image_name == self.image_name
            && existing.container_disk_in_gb == self.container_disk_in_gb
            && existing.volume_in_gb == self.volume_in_gb
            && existing.volume_mount_path == self.volume_mount_path
            && existing.env == self.env
    }
}

use serde::{Deserialize, Serialize};

use crate::domain::{ResourceId, Zone};

/// Desired persistent volume, as sent on create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpec {
    /// Deterministic name (`storage-{env}`).
    pub name: String,
    /// Capacity in GB.
    pub size: u32,
    /// Placement zone. Immutable once the volume exists.
    #[serde(rename = "dataCenterId")]
    pub zone: Zone,
}

/// Persistent network volume as reported by the control plane.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: ResourceId,
    pub name: String,
    /// Capacity in GB.
    #[serde(default)]
    pub size: u32,
    #[serde(rename = "dataCenterId")]
    pub zone: Zone,
}

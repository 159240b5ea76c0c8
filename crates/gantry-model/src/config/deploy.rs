use serde::{Deserialize, Serialize};

use crate::{
    domain::{Env, Environment, TimeoutMs, Zone},
    error::{ModelError, ModelResult},
    job::WorkloadRequest,
    resource::{ScalerKind, TemplateSpec, VolumeSpec},
};

/// Complete desired state for one pipeline run.
///
/// One explicit value per run: nothing in the pipeline falls back to ambient
/// defaults or reads files, which keeps reruns with the same value convergent.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    /// Target environment; every resource name derives from it.
    pub environment: Environment,
    /// Workload name used as the template/endpoint name prefix.
    pub workload: String,
    /// Image reference produced by the external build step.
    pub image: String,
    pub volume: VolumeConfig,
    #[serde(default)]
    pub template: TemplateConfig,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub verify: VerifyConfig,
    /// Variables injected into the template. Values are opaque.
    #[serde(default)]
    pub env: Env,
}

/// Persistent volume parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeConfig {
    #[serde(default = "default_volume_size")]
    pub size_gb: u32,
    pub zone: Zone,
}

/// Container template parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateConfig {
    /// Ephemeral container disk in GB.
    pub container_disk_gb: u32,
    /// Persistent mount size in GB; defaults to the volume size.
    pub mount_size_gb: Option<u32>,
    pub mount_path: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            container_disk_gb: 20,
            mount_size_gb: None,
            mount_path: "/runpod-volume".to_string(),
        }
    }
}

/// Scaling signal and its threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScalerPolicy {
    pub kind: ScalerKind,
    pub value: u32,
}

impl Default for ScalerPolicy {
    fn default() -> Self {
        Self {
            kind: ScalerKind::QueueDelay,
            value: 4,
        }
    }
}

/// Compute endpoint parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointConfig {
    /// Requested zone. Must equal the volume's zone; `None` inherits it.
    pub zone: Option<Zone>,
    pub workers_min: u32,
    pub workers_max: u32,
    /// Idle seconds before a worker is scaled down.
    pub idle_timeout_secs: u32,
    pub execution_timeout_ms: TimeoutMs,
    pub scaler: ScalerPolicy,
    pub gpu_types: Vec<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            zone: None,
            workers_min: 0,
            workers_max: 1,
            idle_timeout_secs: 5,
            execution_timeout_ms: 600_000,
            scaler: ScalerPolicy::default(),
            gpu_types: Vec::new(),
        }
    }
}

/// Smoke test parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyConfig {
    /// Request sent to the freshly deployed endpoint.
    pub probe: WorkloadRequest,
    /// Overall verification deadline.
    pub deadline_ms: TimeoutMs,
    /// Status poll interval once the run falls back to async submission.
    pub poll_interval_ms: TimeoutMs,
    /// Reconcile only; do not submit a test job.
    pub skip: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            probe: WorkloadRequest::Diagnose,
            deadline_ms: 300_000,
            poll_interval_ms: 3_000,
            skip: false,
        }
    }
}

fn default_volume_size() -> u32 {
    100
}

impl DeployConfig {
    /// Replace the environment.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Replace the image reference (new rollout).
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Merge extra injected variables; entries from `extra` win.
    pub fn with_env(mut self, extra: &Env) -> Self {
        self.env = self.env.merged(extra);
        self
    }

    /// Desired volume for this environment.
    pub fn volume_spec(&self) -> VolumeSpec {
        VolumeSpec {
            name: self.environment.volume_name(),
            size: self.volume.size_gb,
            zone: self.volume.zone.clone(),
        }
    }

    /// Desired template for this environment.
    pub fn template_spec(&self) -> TemplateSpec {
        TemplateSpec {
            name: self.environment.template_name(&self.workload),
            image_name: self.image.clone(),
            container_disk_in_gb: self.template.container_disk_gb,
            volume_in_gb: self.template.mount_size_gb.unwrap_or(self.volume.size_gb),
            volume_mount_path: self.template.mount_path.clone(),
            env: self.env.clone(),
            is_serverless: true,
        }
    }

    /// Endpoint name for this environment.
    pub fn endpoint_name(&self) -> String {
        self.environment.endpoint_name(&self.workload)
    }

    /// Check the configuration before any remote call is made.
    pub fn validate(&self) -> ModelResult<()> {
        let workload_ok = !self.workload.is_empty()
            && self
                .workload
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !workload_ok {
            return Err(ModelError::Invalid(format!(
                "workload name '{}' must be lowercase alphanumerics and '-'",
                self.workload
            )));
        }
        if self.image.trim().is_empty() || self.image.chars().any(char::is_whitespace) {
            return Err(ModelError::Invalid(format!(
                "image reference '{}' is empty or contains whitespace",
                self.image
            )));
        }
        if self.volume.size_gb == 0 {
            return Err(ModelError::Invalid("volume.sizeGb must be > 0".into()));
        }
        if self.volume.zone.trim().is_empty() {
            return Err(ModelError::Invalid("volume.zone is empty".into()));
        }
        if self.template.container_disk_gb == 0 {
            return Err(ModelError::Invalid("template.containerDiskGb must be > 0".into()));
        }
        if self.template.mount_size_gb == Some(0) {
            return Err(ModelError::Invalid("template.mountSizeGb must be > 0".into()));
        }
        if !self.template.mount_path.starts_with('/') {
            return Err(ModelError::Invalid(format!(
                "template.mountPath '{}' must be absolute",
                self.template.mount_path
            )));
        }
        let ep = &self.endpoint;
        if ep.workers_max == 0 {
            return Err(ModelError::Invalid("endpoint.workersMax must be > 0".into()));
        }
        if ep.workers_min > ep.workers_max {
            return Err(ModelError::Invalid(format!(
                "endpoint.workersMin ({}) exceeds workersMax ({})",
                ep.workers_min, ep.workers_max
            )));
        }
        if ep.execution_timeout_ms == 0 {
            return Err(ModelError::Invalid("endpoint.executionTimeoutMs must be > 0".into()));
        }
        if ep.zone.as_deref().is_some_and(|z| z.trim().is_empty()) {
            return Err(ModelError::Invalid("endpoint.zone is empty".into()));
        }
        if self.verify.deadline_ms == 0 || self.verify.poll_interval_ms == 0 {
            return Err(ModelError::Invalid(
                "verify.deadlineMs and verify.pollIntervalMs must be > 0".into(),
            ));
        }
        if let WorkloadRequest::ListFiles { path } = &self.verify.probe {
            if path.trim().is_empty() {
                return Err(ModelError::Invalid("verify.probe.path is empty".into()));
            }
        }
        Ok(())
    }
}

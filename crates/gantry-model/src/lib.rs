mod domain;
pub use domain::{ENVIRONMENT_MAX_LEN, REDACTED, VOLUME_NAME_PREFIX};
pub use domain::{Env, Environment, Opaque, ResourceId, TimeoutMs, Zone};

mod error;
pub use error::{ModelError, ModelResult};

mod resource;
pub use resource::{
    Endpoint, EndpointHealth, EndpointSpec, EndpointState, JobCounts, ScalerKind, Template,
    TemplateSpec, Volume, VolumeSpec, WorkerCounts,
};

mod job;
pub use job::{Job, JobStatus, SubmitMode, WorkloadRequest, error_text};

mod strategy;
pub use strategy::{AdmissionStrategy, BackoffStrategy, JitterStrategy};

mod config;
pub use config::{
    DeployConfig, EndpointConfig, ScalerPolicy, TemplateConfig, VerifyConfig, VolumeConfig,
};

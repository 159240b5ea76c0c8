//! Control-plane seam used by the reconcilers and the verifier.
//!
//! Concrete clients implement [`ResourceApi`]; the pipeline only ever sees the trait.
mod error;
pub use error::{ApiError, ApiErrorKind};

use async_trait::async_trait;
use serde_json::Value;

use gantry_model::{
    Endpoint, EndpointHealth, EndpointSpec, Job, SubmitMode, Template, TemplateSpec, Volume,
    VolumeSpec,
};

pub type ApiResult<T> = Result<T, ApiError>;

/// Typed access to the remote control plane and the deployed endpoint.
///
/// Contract:
/// - `list_*` return every record whose name equals `name` exactly (possibly more than one).
/// - write operations are safe to retry: implementations attach an idempotency key that is
///   reused across the retry attempts of one call.
/// - transient failures are retried inside the implementation; an error that reaches the
///   caller is final.
/// - `submit_job` is sent once. A transient error from it leaves the job's existence
///   unknown, and the caller decides what to do next.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn list_volumes(&self, name: &str) -> ApiResult<Vec<Volume>>;

    async fn get_volume(&self, id: &str) -> ApiResult<Volume>;

    async fn create_volume(&self, spec: &VolumeSpec) -> ApiResult<Volume>;

    async fn list_templates(&self, name: &str) -> ApiResult<Vec<Template>>;

    async fn create_template(&self, spec: &TemplateSpec) -> ApiResult<Template>;

    async fn update_template(&self, id: &str, spec: &TemplateSpec) -> ApiResult<Template>;

    async fn list_endpoints(&self, name: &str) -> ApiResult<Vec<Endpoint>>;

    async fn create_endpoint(&self, spec: &EndpointSpec) -> ApiResult<Endpoint>;

    async fn update_endpoint(&self, id: &str, spec: &EndpointSpec) -> ApiResult<Endpoint>;

    /// Worker and job counters of an endpoint.
    async fn endpoint_health(&self, endpoint_id: &str) -> ApiResult<EndpointHealth>;

    /// Submit `payload` (`{"input": {...}}`) to an endpoint.
    async fn submit_job(
        &self,
        endpoint_id: &str,
        payload: &Value,
        mode: SubmitMode,
    ) -> ApiResult<Job>;

    async fn job_status(&self, endpoint_id: &str, job_id: &str) -> ApiResult<Job>;
}

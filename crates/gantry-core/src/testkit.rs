//! In-memory control plane used by the unit tests.
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::{Value, json};

use gantry_model::{
    Endpoint, EndpointHealth, EndpointSpec, Job, JobStatus, SubmitMode, Template, TemplateSpec,
    Volume, VolumeSpec,
};

use crate::api::{ApiError, ApiResult, ResourceApi};

pub(crate) struct FakeState {
    pub volumes: Vec<Volume>,
    pub templates: Vec<Template>,
    pub endpoints: Vec<Endpoint>,
    /// Operation names in call order.
    pub calls: Vec<&'static str>,
    /// Payloads of every write, serialized, for leak checks.
    pub bodies: Vec<String>,
    /// One-shot failures keyed by operation name.
    pub failures: HashMap<&'static str, ApiError>,
    pub health: EndpointHealth,
    /// Status returned by a sync submission.
    pub sync_status: JobStatus,
    /// Statuses returned by successive status polls; the last one repeats.
    pub polls: VecDeque<JobStatus>,
    pub output: Value,
    pub job_error: Option<Value>,
    next_id: u32,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            volumes: Vec::new(),
            templates: Vec::new(),
            endpoints: Vec::new(),
            calls: Vec::new(),
            bodies: Vec::new(),
            failures: HashMap::new(),
            health: EndpointHealth::default(),
            sync_status: JobStatus::Completed,
            polls: VecDeque::new(),
            output: json!({
                "gpu_count": 1,
                "gpu_details": [{"name": "NVIDIA A40", "memory_total_gb": 44.3}]
            }),
            job_error: None,
            next_id: 0,
        }
    }
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn job(&self, id: &str, status: JobStatus) -> Job {
        let mut job = Job::queued(id);
        job.status = status;
        if status == JobStatus::Completed {
            job.output = Some(self.output.clone());
        }
        if status.is_terminal() {
            job.error = self.job_error.clone();
        }
        job
    }
}

#[derive(Default)]
pub(crate) struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.state().calls.iter().filter(|c| **c == op).count()
    }

    pub fn creates(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with("create_"))
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn fail_once(&self, op: &'static str, err: ApiError) {
        self.state().failures.insert(op, err);
    }

    fn enter(&self, op: &'static str) -> ApiResult<MutexGuard<'_, FakeState>> {
        let mut st = self.state();
        st.calls.push(op);
        match st.failures.remove(op) {
            Some(err) => Err(err),
            None => Ok(st),
        }
    }
}

#[async_trait]
impl ResourceApi for FakeApi {
    async fn list_volumes(&self, name: &str) -> ApiResult<Vec<Volume>> {
        let st = self.enter("list_volumes")?;
        Ok(st.volumes.iter().filter(|v| v.name == name).cloned().collect())
    }

    async fn get_volume(&self, id: &str) -> ApiResult<Volume> {
        let st = self.enter("get_volume")?;
        st.volumes
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .ok_or_else(|| ApiError::permanent("get_volume", "not found").with_status(404))
    }

    async fn create_volume(&self, spec: &VolumeSpec) -> ApiResult<Volume> {
        let mut st = self.enter("create_volume")?;
        let vol = Volume {
            id: st.next_id("vol"),
            name: spec.name.clone(),
            size: spec.size,
            zone: spec.zone.clone(),
        };
        st.volumes.push(vol.clone());
        Ok(vol)
    }

    async fn list_templates(&self, name: &str) -> ApiResult<Vec<Template>> {
        let st = self.enter("list_templates")?;
        Ok(st.templates.iter().filter(|t| t.name == name).cloned().collect())
    }

    async fn create_template(&self, spec: &TemplateSpec) -> ApiResult<Template> {
        let mut st = self.enter("create_template")?;
        st.bodies.push(serde_json::to_string(spec).unwrap());
        let tpl = template_from(st.next_id("tpl"), spec);
        st.templates.push(tpl.clone());
        Ok(tpl)
    }

    async fn update_template(&self, id: &str, spec: &TemplateSpec) -> ApiResult<Template> {
        let mut st = self.enter("update_template")?;
        st.bodies.push(serde_json::to_string(spec).unwrap());
        let tpl = template_from(id.to_string(), spec);
        match st.templates.iter_mut().find(|t| t.id == id) {
            Some(slot) => *slot = tpl.clone(),
            None => return Err(ApiError::permanent("update_template", "not found").with_status(404)),
        }
        Ok(tpl)
    }

    async fn list_endpoints(&self, name: &str) -> ApiResult<Vec<Endpoint>> {
        let st = self.enter("list_endpoints")?;
        Ok(st.endpoints.iter().filter(|e| e.name == name).cloned().collect())
    }

    async fn create_endpoint(&self, spec: &EndpointSpec) -> ApiResult<Endpoint> {
        let mut st = self.enter("create_endpoint")?;
        let ep = endpoint_from(st.next_id("ep"), spec);
        st.endpoints.push(ep.clone());
        Ok(ep)
    }

    async fn update_endpoint(&self, id: &str, spec: &EndpointSpec) -> ApiResult<Endpoint> {
        let mut st = self.enter("update_endpoint")?;
        let ep = endpoint_from(id.to_string(), spec);
        match st.endpoints.iter_mut().find(|e| e.id == id) {
            Some(slot) => *slot = ep.clone(),
            None => return Err(ApiError::permanent("update_endpoint", "not found").with_status(404)),
        }
        Ok(ep)
    }

    async fn endpoint_health(&self, _endpoint_id: &str) -> ApiResult<EndpointHealth> {
        let st = self.enter("endpoint_health")?;
        Ok(st.health.clone())
    }

    async fn submit_job(&self, _endpoint_id: &str, _payload: &Value, mode: SubmitMode) -> ApiResult<Job> {
        match mode {
            SubmitMode::Sync => {
                let st = self.enter("submit_sync")?;
                Ok(st.job("job-sync", st.sync_status))
            }
            SubmitMode::Async => {
                let st = self.enter("submit_async")?;
                Ok(st.job("job-async", JobStatus::Queued))
            }
        }
    }

    async fn job_status(&self, _endpoint_id: &str, job_id: &str) -> ApiResult<Job> {
        let mut st = self.enter("job_status")?;
        let status = if st.polls.len() > 1 {
            st.polls.pop_front().unwrap()
        } else {
            st.polls.front().copied().unwrap_or(JobStatus::Completed)
        };
        Ok(st.job(job_id, status))
    }
}

fn template_from(id: String, spec: &TemplateSpec) -> Template {
    Template {
        id,
        name: spec.name.clone(),
        image_name: spec.image_name.clone(),
        container_disk_in_gb: spec.container_disk_in_gb,
        volume_in_gb: spec.volume_in_gb,
        volume_mount_path: spec.volume_mount_path.clone(),
        env: spec.env.clone(),
    }
}

fn endpoint_from(id: String, spec: &EndpointSpec) -> Endpoint {
    Endpoint {
        id,
        name: spec.name.clone(),
        template_id: spec.template_id.clone(),
        network_volume_id: spec.network_volume_id.clone(),
        data_center_ids: spec.data_center_ids.clone(),
        workers_min: spec.workers_min,
        workers_max: spec.workers_max,
        idle_timeout: spec.idle_timeout,
        execution_timeout_ms: spec.execution_timeout_ms,
        scaler_type: spec.scaler_type,
        scaler_value: spec.scaler_value,
        gpu_type_ids: spec.gpu_type_ids.clone(),
    }
}

/// Metrics backend that keeps every event as a formatted line.
#[derive(Default)]
pub(crate) struct RecordingMetrics {
    events: Mutex<Vec<String>>,
}

impl RecordingMetrics {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl crate::metrics::MetricsBackend for RecordingMetrics {
    fn record_stage_started(&self, stage: &str) {
        self.push(format!("start {stage}"));
    }

    fn record_stage_completed(&self, stage: &str, outcome: crate::metrics::StageOutcome, _: u64) {
        self.push(format!("end {stage} {}", outcome.as_label()));
    }

    fn record_resource_action(&self, resource: &str, action: &str) {
        self.push(format!("{resource} {action}"));
    }

    fn record_remote_error(&self, operation: &str, error_kind: &str) {
        self.push(format!("error {operation} {error_kind}"));
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, instrument, trace, warn};
use url::Url;
use uuid::Uuid;

use gantry_core::{
    api::{ApiError, ApiResult, ResourceApi},
    metrics::{MetricsHandle, noop_metrics},
};
use gantry_model::{
    Endpoint, EndpointHealth, EndpointSpec, Job, Opaque, SubmitMode, Template, TemplateSpec,
    Volume, VolumeSpec,
};

use crate::{
    classify,
    config::ClientConfig,
    error::{ClientError, ClientResult},
    retry::RetryPolicy,
};

const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

/// List responses are bare arrays; some deployments wrap them.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "data")]
        items: Vec<T>,
    },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(v) | Listing::Wrapped { items: v } => v,
        }
    }
}

/// Control-plane and job client with retries on transient failures.
///
/// Every control-plane write carries an `Idempotency-Key` generated once per call and
/// repeated on each retry of that call. Job submissions are sent once.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    rest: Url,
    jobs: Url,
    api_key: Opaque,
    timeout: Duration,
    sync_timeout: Duration,
    retry: RetryPolicy,
    metrics: MetricsHandle,
}

impl RestClient {
    pub fn new(cfg: &ClientConfig) -> ClientResult<Self> {
        if cfg.api_key.is_empty() {
            return Err(ClientError::MissingApiKey);
        }
        if cfg.retry.attempts == 0 {
            return Err(ClientError::NoAttempts);
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("gantry/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            rest: base_url(&cfg.rest_url)?,
            jobs: base_url(&cfg.jobs_url)?,
            api_key: cfg.api_key.clone(),
            timeout: Duration::from_millis(cfg.timeout_ms),
            sync_timeout: Duration::from_millis(cfg.sync_timeout_ms),
            retry: cfg.retry.clone(),
            metrics: noop_metrics(),
        })
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    fn rest_url(&self, segments: &[&str]) -> Url {
        extend(&self.rest, segments)
    }

    fn jobs_url(&self, segments: &[&str]) -> Url {
        extend(&self.jobs, segments)
    }

    /// Send one logical request, retrying transient failures.
    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: Option<Value>,
        timeout: Duration,
    ) -> ApiResult<T> {
        let key = (method != Method::GET).then(|| Uuid::new_v4().to_string());
        let mut prev = self.retry.initial();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self
                .attempt(operation, &method, &url, body.as_ref(), key.as_deref(), timeout)
                .await
            {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            self.metrics
                .record_remote_error(operation, err.kind.as_label());

            if !err.is_transient() {
                return Err(ApiError { attempts: attempt, ..err });
            }
            if attempt >= self.retry.attempts {
                warn!(operation, attempts = attempt, status = ?err.status, "retry budget exhausted");
                return Err(err.exhausted(attempt));
            }

            let delay = self
                .retry
                .delay(attempt, prev, err.retry_after, &mut rand::rng());
            prev = delay;
            warn!(
                operation,
                attempt,
                status = ?err.status,
                delay_ms = delay.as_millis() as u64,
                "transient failure; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Send a job submission exactly once.
    ///
    /// The job api ignores idempotency keys, so a repeated POST would queue a second
    /// job. A transient error is returned as is: the job may or may not exist.
    async fn submit<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
        body: &Value,
        timeout: Duration,
    ) -> ApiResult<T> {
        let res = self
            .attempt(operation, &Method::POST, &url, Some(body), None, timeout)
            .await;
        if let Err(err) = &res {
            self.metrics
                .record_remote_error(operation, err.kind.as_label());
            warn!(operation, status = ?err.status, kind = err.kind.as_label(), "job submission failed; not retried");
        }
        res
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: &Method,
        url: &Url,
        body: Option<&Value>,
        key: Option<&str>,
        timeout: Duration,
    ) -> ApiResult<T> {
        let mut req = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(self.api_key.expose())
            .timeout(timeout);
        if let Some(key) = key {
            req = req.header(IDEMPOTENCY_KEY, key);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        trace!(operation, %method, url = %url, "sending request");
        let resp = req
            .send()
            .await
            .map_err(|e| classify::transport(operation, &e))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = classify::retry_after(resp.headers());
            let text = resp.text().await.unwrap_or_default();
            return Err(classify::status(operation, status, &text, retry_after));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| classify::transport(operation, &e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::permanent(operation, format!("undecodable response: {e}")))
    }

    async fn list<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        collection: &str,
        name: &str,
        name_of: impl Fn(&T) -> &str,
    ) -> ApiResult<Vec<T>> {
        let listing: Listing<T> = self
            .call(operation, Method::GET, self.rest_url(&[collection]), None, self.timeout)
            .await?;
        let found: Vec<T> = listing
            .into_vec()
            .into_iter()
            .filter(|r| name_of(r) == name)
            .collect();
        debug!(operation, name, found = found.len(), "listed records");
        Ok(found)
    }
}

#[async_trait]
impl ResourceApi for RestClient {
    #[instrument(level = "debug", skip(self))]
    async fn list_volumes(&self, name: &str) -> ApiResult<Vec<Volume>> {
        self.list("list_volumes", "networkvolumes", name, |v: &Volume| v.name.as_str())
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_volume(&self, id: &str) -> ApiResult<Volume> {
        let url = self.rest_url(&["networkvolumes", id]);
        self.call("get_volume", Method::GET, url, None, self.timeout)
            .await
    }

    #[instrument(level = "debug", skip_all, fields(name = %spec.name))]
    async fn create_volume(&self, spec: &VolumeSpec) -> ApiResult<Volume> {
        let body = to_body("create_volume", spec)?;
        let url = self.rest_url(&["networkvolumes"]);
        self.call("create_volume", Method::POST, url, Some(body), self.timeout)
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_templates(&self, name: &str) -> ApiResult<Vec<Template>> {
        self.list("list_templates", "templates", name, |t: &Template| t.name.as_str())
            .await
    }

    #[instrument(level = "debug", skip_all, fields(name = %spec.name))]
    async fn create_template(&self, spec: &TemplateSpec) -> ApiResult<Template> {
        let body = to_body("create_template", spec)?;
        let url = self.rest_url(&["templates"]);
        self.call("create_template", Method::POST, url, Some(body), self.timeout)
            .await
    }

    #[instrument(level = "debug", skip_all, fields(id = %id, name = %spec.name))]
    async fn update_template(&self, id: &str, spec: &TemplateSpec) -> ApiResult<Template> {
        let body = to_body("update_template", spec)?;
        let url = self.rest_url(&["templates", id]);
        self.call("update_template", Method::PATCH, url, Some(body), self.timeout)
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_endpoints(&self, name: &str) -> ApiResult<Vec<Endpoint>> {
        self.list("list_endpoints", "endpoints", name, |e: &Endpoint| e.name.as_str())
            .await
    }

    #[instrument(level = "debug", skip_all, fields(name = %spec.name))]
    async fn create_endpoint(&self, spec: &EndpointSpec) -> ApiResult<Endpoint> {
        let body = to_body("create_endpoint", spec)?;
        let url = self.rest_url(&["endpoints"]);
        self.call("create_endpoint", Method::POST, url, Some(body), self.timeout)
            .await
    }

    #[instrument(level = "debug", skip_all, fields(id = %id, name = %spec.name))]
    async fn update_endpoint(&self, id: &str, spec: &EndpointSpec) -> ApiResult<Endpoint> {
        let body = to_body("update_endpoint", spec)?;
        let url = self.rest_url(&["endpoints", id]);
        self.call("update_endpoint", Method::PATCH, url, Some(body), self.timeout)
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn endpoint_health(&self, endpoint_id: &str) -> ApiResult<EndpointHealth> {
        let url = self.jobs_url(&[endpoint_id, "health"]);
        self.call("endpoint_health", Method::GET, url, None, self.timeout)
            .await
    }

    #[instrument(level = "debug", skip(self, payload, mode), fields(mode = mode.as_str()))]
    async fn submit_job(
        &self,
        endpoint_id: &str,
        payload: &Value,
        mode: SubmitMode,
    ) -> ApiResult<Job> {
        let (operation, tail, timeout) = match mode {
            SubmitMode::Sync => ("submit_job_sync", "runsync", self.sync_timeout),
            SubmitMode::Async => ("submit_job_async", "run", self.timeout),
        };
        let url = self.jobs_url(&[endpoint_id, tail]);
        self.submit(operation, url, payload, timeout).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn job_status(&self, endpoint_id: &str, job_id: &str) -> ApiResult<Job> {
        let url = self.jobs_url(&[endpoint_id, "status", job_id]);
        self.call("job_status", Method::GET, url, None, self.timeout)
            .await
    }
}

fn base_url(raw: &str) -> ClientResult<Url> {
    let invalid = |reason: String| ClientError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http(s) base url".into()));
    }
    Ok(url)
}

/// Append path segments, percent-encoding each one.
fn extend(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

fn to_body<S: serde::Serialize>(operation: &'static str, spec: &S) -> ApiResult<Value> {
    serde_json::to_value(spec)
        .map_err(|e| ApiError::permanent(operation, format!("unencodable request: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use gantry_core::verify::Verifier;
    use gantry_model::{BackoffStrategy, Env, JitterStrategy, JobStatus, WorkloadRequest};
    use tokio_util::sync::CancellationToken;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, body_partial_json, header, header_exists, method, path},
    };

    fn client(server: &MockServer, attempts: u32) -> RestClient {
        client_with_sync_timeout(server, attempts, 2_000)
    }

    fn client_with_sync_timeout(server: &MockServer, attempts: u32, sync_timeout_ms: u64) -> RestClient {
        let cfg = ClientConfig {
            rest_url: format!("{}/v1/", server.uri()),
            jobs_url: format!("{}/v2/", server.uri()),
            timeout_ms: 2_000,
            sync_timeout_ms,
            retry: RetryPolicy {
                attempts,
                backoff: BackoffStrategy {
                    jitter: JitterStrategy::None,
                    first_ms: 1,
                    max_ms: 5,
                    factor: 2.0,
                },
            },
            ..ClientConfig::default()
        }
        .with_api_key("test-key");
        RestClient::new(&cfg).unwrap()
    }

    fn template_spec() -> TemplateSpec {
        TemplateSpec {
            name: "probe-staging".into(),
            image_name: "repo/img:sha123".into(),
            container_disk_in_gb: 20,
            volume_in_gb: 100,
            volume_mount_path: "/runpod-volume".into(),
            env: Env::single("MODE", "gpu"),
            is_serverless: true,
        }
    }

    fn template_json(id: &str) -> Value {
        json!({
            "id": id,
            "name": "probe-staging",
            "imageName": "repo/img:sha123",
            "containerDiskInGb": 20,
            "volumeInGb": 100,
            "volumeMountPath": "/runpod-volume",
            "env": {"MODE": "gpu"}
        })
    }

    #[test]
    fn rejects_missing_key_and_bad_urls() {
        assert!(matches!(
            RestClient::new(&ClientConfig::default()),
            Err(ClientError::MissingApiKey)
        ));
        let cfg = ClientConfig {
            rest_url: "not a url".into(),
            ..ClientConfig::default()
        }
        .with_api_key("k");
        assert!(matches!(RestClient::new(&cfg), Err(ClientError::InvalidUrl { .. })));
    }

    #[test]
    fn urls_keep_base_path() {
        let base = base_url("https://api.runpod.ai/v2/").unwrap();
        assert_eq!(
            extend(&base, &["ep-1", "status", "job-1"]).as_str(),
            "https://api.runpod.ai/v2/ep-1/status/job-1"
        );
        let bare = base_url("https://rest.runpod.io/v1").unwrap();
        assert_eq!(extend(&bare, &["templates"]).as_str(), "https://rest.runpod.io/v1/templates");
    }

    #[tokio::test]
    async fn list_filters_exact_name_and_authenticates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/templates"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                template_json("t1"),
                {"id": "t2", "name": "probe-staging-old", "imageName": "x"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let found = client(&server, 3).list_templates("probe-staging").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "t1");
        assert_eq!(found[0].env.get("MODE").unwrap().expose(), "gpu");
    }

    #[tokio::test]
    async fn wrapped_listing_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/networkvolumes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "vol-1", "name": "storage-dev", "size": 50, "dataCenterId": "EU-RO-1"}]
            })))
            .mount(&server)
            .await;

        let found = client(&server, 1).list_volumes("storage-dev").await.unwrap();
        assert_eq!(found[0].zone, "EU-RO-1");
    }

    #[tokio::test]
    async fn write_sends_body_and_idempotency_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/templates"))
            .and(header_exists("idempotency-key"))
            .and(body_partial_json(json!({
                "name": "probe-staging",
                "imageName": "repo/img:sha123",
                "isServerless": true,
                "env": {"MODE": "gpu"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(template_json("tpl-1")))
            .expect(1)
            .mount(&server)
            .await;

        let tpl = client(&server, 3).create_template(&template_spec()).await.unwrap();
        assert_eq!(tpl.id, "tpl-1");
    }

    #[tokio::test]
    async fn transient_failures_retry_with_the_same_key() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/templates/tpl-1"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/v1/templates/tpl-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(template_json("tpl-1")))
            .mount(&server)
            .await;

        let tpl = client(&server, 5)
            .update_template("tpl-1", &template_spec())
            .await
            .unwrap();
        assert_eq!(tpl.id, "tpl-1");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
        let keys: Vec<_> = requests
            .iter()
            .map(|r| r.headers.get("idempotency-key").cloned())
            .collect();
        assert!(keys[0].is_some());
        assert!(keys.iter().all(|k| *k == keys[0]));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/endpoints"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "networkVolumeId not in dataCenterIds"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let spec = EndpointSpec {
            name: "probe-staging".into(),
            template_id: "tpl-1".into(),
            network_volume_id: Some("vol-1".into()),
            data_center_ids: vec!["Z1".into()],
            workers_min: 0,
            workers_max: 1,
            idle_timeout: 5,
            execution_timeout_ms: 600_000,
            scaler_type: Default::default(),
            scaler_value: 4,
            gpu_type_ids: vec![],
        };
        let err = client(&server, 5).create_endpoint(&spec).await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(err.status, Some(400));
        assert_eq!(err.attempts, 1);
        assert_eq!(err.message, "networkVolumeId not in dataCenterIds");
    }

    #[tokio::test]
    async fn exhausted_retries_escalate_as_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/endpoints"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server, 3).list_endpoints("probe-staging").await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(err.attempts, 3);
        assert_eq!(err.status, Some(502));
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[tokio::test]
    async fn undecodable_body_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/networkvolumes/vol-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, 5).get_volume("vol-1").await.unwrap_err();
        assert!(!err.is_transient());
        assert!(err.message.contains("undecodable"));
    }

    #[tokio::test]
    async fn sync_submission_posts_input_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/ep-1/runsync"))
            .and(body_json(json!({"input": {}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "job-1",
                "status": "COMPLETED",
                "output": {"gpu_count": 1, "gpu_details": [{"name": "NVIDIA A40"}]}
            })))
            .mount(&server)
            .await;

        let job = client(&server, 1)
            .submit_job("ep-1", &WorkloadRequest::Diagnose.payload(), SubmitMode::Sync)
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.output.unwrap()["gpu_count"], 1);
    }

    #[tokio::test]
    async fn job_submission_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/ep-1/run"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, 5)
            .submit_job("ep-1", &WorkloadRequest::Diagnose.payload(), SubmitMode::Async)
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(err.attempts, 1);
    }

    #[tokio::test]
    async fn slow_sync_submission_is_sent_once_then_polled_async() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/ep-1/runsync"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(3))
                    .set_body_json(json!({"id": "job-sync", "status": "COMPLETED"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/ep-1/run"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "job-2", "status": "IN_QUEUE"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/ep-1/status/job-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "job-2",
                "status": "COMPLETED",
                "output": {"gpu_details": [{"name": "NVIDIA A40"}]}
            })))
            .mount(&server)
            .await;

        let api = Arc::new(client_with_sync_timeout(&server, 5, 200));
        let report = Verifier::new(api)
            .with_poll_interval(Duration::from_millis(20))
            .with_deadline(Duration::from_secs(10))
            .verify("ep-1", &WorkloadRequest::Diagnose, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.mode, SubmitMode::Async);
        assert_eq!(report.job_id, "job-2");
    }

    #[tokio::test]
    async fn status_poll_maps_wire_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/ep-1/status/job-9"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "job-9", "status": "IN_PROGRESS"})),
            )
            .mount(&server)
            .await;

        let job = client(&server, 1).job_status("ep-1", "job-9").await.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.output.is_none());
    }

    #[tokio::test]
    async fn health_decodes_worker_counts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/ep-1/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobs": {"completed": 3, "failed": 0, "inProgress": 1, "inQueue": 0, "retried": 0},
                "workers": {"idle": 0, "initializing": 0, "ready": 1, "running": 1, "throttled": 0, "unhealthy": 0}
            })))
            .mount(&server)
            .await;

        let health = client(&server, 1).endpoint_health("ep-1").await.unwrap();
        assert_eq!(health.jobs.in_progress, 1);
        assert_eq!(health.workers.running, 1);
    }
}

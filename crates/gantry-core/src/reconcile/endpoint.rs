use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use gantry_model::{
    DeployConfig, Endpoint, EndpointConfig, EndpointSpec, EndpointState, ResourceId, Zone,
};

use crate::{
    api::ResourceApi,
    error::CoreError,
    metrics::MetricsHandle,
    reconcile::{ReconcileAction, Reconciled, pick_existing},
};

/// Desired endpoint, bound to an already reconciled template and volume.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointRequest {
    pub name: String,
    pub template_id: ResourceId,
    pub volume_id: Option<ResourceId>,
    pub config: EndpointConfig,
}

impl EndpointRequest {
    pub fn new(name: impl Into<String>, template_id: impl Into<ResourceId>, config: EndpointConfig) -> Self {
        Self {
            name: name.into(),
            template_id: template_id.into(),
            volume_id: None,
            config,
        }
    }

    /// Endpoint of `cfg`'s environment.
    pub fn for_deploy(cfg: &DeployConfig, template_id: impl Into<ResourceId>) -> Self {
        Self::new(cfg.endpoint_name(), template_id, cfg.endpoint.clone())
    }

    /// Attach a persistent volume.
    pub fn with_volume(mut self, volume_id: impl Into<ResourceId>) -> Self {
        self.volume_id = Some(volume_id.into());
        self
    }

    fn spec(&self, zone: Option<Zone>) -> EndpointSpec {
        let cfg = &self.config;
        EndpointSpec {
            name: self.name.clone(),
            template_id: self.template_id.clone(),
            network_volume_id: self.volume_id.clone(),
            data_center_ids: zone.into_iter().collect(),
            workers_min: cfg.workers_min,
            workers_max: cfg.workers_max,
            idle_timeout: cfg.idle_timeout_secs,
            execution_timeout_ms: cfg.execution_timeout_ms,
            scaler_type: cfg.scaler.kind,
            scaler_value: cfg.scaler.value,
            gpu_type_ids: cfg.gpu_types.clone(),
        }
    }
}

/// Keeps the environment's serverless endpoint pointed at its template and volume.
///
/// An endpoint with an attached volume can only run in that volume's zone. Every
/// violation of that rule is rejected before anything is written.
#[derive(Clone)]
pub struct EndpointReconciler {
    api: Arc<dyn ResourceApi>,
    metrics: MetricsHandle,
}

impl EndpointReconciler {
    pub fn new(api: Arc<dyn ResourceApi>, metrics: MetricsHandle) -> Self {
        Self { api, metrics }
    }

    #[instrument(
        level = "debug",
        skip(self, req),
        fields(endpoint = %req.name, template = %req.template_id, volume = ?req.volume_id)
    )]
    pub async fn reconcile(&self, req: &EndpointRequest) -> Result<Reconciled<Endpoint>, CoreError> {
        let zone = self.placement(req).await?;

        let found = self.api.list_endpoints(&req.name).await?;
        let existing = pick_existing(&req.name, found);
        if let Some(ep) = &existing {
            self.check_attached(ep, req, zone.as_deref()).await?;
        }

        let spec = req.spec(zone);
        let out = match existing {
            Some(ep) if spec.matches(&ep) => {
                debug!(id = %ep.id, "endpoint already up to date");
                Reconciled::new(ep, ReconcileAction::Unchanged)
            }
            Some(ep) => {
                let updated = self.api.update_endpoint(&ep.id, &spec).await?;
                info!(id = %updated.id, zone = ?updated.zone(), "updated endpoint in place");
                Reconciled::new(updated, ReconcileAction::Updated)
            }
            None => {
                let created = self.api.create_endpoint(&spec).await?;
                info!(id = %created.id, zone = ?created.zone(), "created endpoint");
                Reconciled::new(created, ReconcileAction::Created)
            }
        };

        self.metrics
            .record_resource_action("endpoint", out.action.as_label());
        Ok(out)
    }

    /// Sample the endpoint's worker counters once.
    ///
    /// Health is informational: failures are logged and yield `None`.
    pub async fn observe(&self, endpoint_id: &str) -> Option<EndpointState> {
        match self.api.endpoint_health(endpoint_id).await {
            Ok(health) => {
                let state = health.state();
                info!(
                    id = endpoint_id,
                    state = %state,
                    ready = health.workers.ready,
                    running = health.workers.running,
                    in_queue = health.jobs.in_queue,
                    "endpoint health"
                );
                Some(state)
            }
            Err(e) => {
                warn!(id = endpoint_id, operation = e.operation, status = ?e.status, "endpoint health unavailable");
                None
            }
        }
    }

    /// Resolve the zone the endpoint must run in.
    ///
    /// With a volume attached the volume's zone wins; an explicitly requested zone
    /// must agree with it. Without a volume the requested zone, if any, is used.
    async fn placement(&self, req: &EndpointRequest) -> Result<Option<Zone>, CoreError> {
        let Some(volume_id) = &req.volume_id else {
            return Ok(req.config.zone.clone());
        };

        let volume = self.api.get_volume(volume_id).await?;
        if let Some(requested) = &req.config.zone {
            if *requested != volume.zone {
                return Err(CoreError::InvariantViolation(format!(
                    "endpoint '{}' requested zone {} but volume {} lives in zone {}",
                    req.name, requested, volume.id, volume.zone
                )));
            }
        }
        Ok(Some(volume.zone))
    }

    /// Reject rebinding an endpoint whose currently attached volume sits in another zone.
    async fn check_attached(
        &self,
        ep: &Endpoint,
        req: &EndpointRequest,
        zone: Option<&str>,
    ) -> Result<(), CoreError> {
        let (Some(attached), Some(zone)) = (&ep.network_volume_id, zone) else {
            return Ok(());
        };
        if req.volume_id.as_ref() == Some(attached) {
            return Ok(());
        }

        let attached_zone = match ep.zone() {
            Some(z) => z.to_string(),
            None => self.api.get_volume(attached).await?.zone,
        };
        if attached_zone != zone {
            return Err(CoreError::InvariantViolation(format!(
                "endpoint '{}' ({}) is attached to volume {} in zone {}; cannot move it to zone {}",
                ep.name, ep.id, attached, attached_zone, zone
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metrics::noop_metrics, testkit::FakeApi};
    use gantry_model::{ScalerKind, Volume, WorkerCounts};

    fn seed_volume(api: &FakeApi, id: &str, zone: &str) {
        api.state().volumes.push(Volume {
            id: id.into(),
            name: format!("storage-{id}"),
            size: 100,
            zone: zone.into(),
        });
    }

    fn request() -> EndpointRequest {
        EndpointRequest::new("probe-staging", "tpl-1", EndpointConfig::default()).with_volume("vol-1")
    }

    #[tokio::test]
    async fn inherits_volume_zone() {
        let api = FakeApi::new();
        seed_volume(&api, "vol-1", "Z1");
        let rec = EndpointReconciler::new(api.clone(), noop_metrics());

        let out = rec.reconcile(&request()).await.unwrap();
        assert_eq!(out.action, ReconcileAction::Created);
        assert_eq!(out.record.data_center_ids, vec!["Z1".to_string()]);
        assert_eq!(out.record.network_volume_id.as_deref(), Some("vol-1"));
        assert_eq!(out.record.scaler_type, ScalerKind::QueueDelay);
    }

    #[tokio::test]
    async fn rejects_zone_other_than_volume_zone_without_writing() {
        let api = FakeApi::new();
        seed_volume(&api, "vol-1", "Z1");
        let rec = EndpointReconciler::new(api.clone(), noop_metrics());

        let mut req = request();
        req.config.zone = Some("Z2".into());
        let err = rec.reconcile(&req).await.unwrap_err();

        assert!(matches!(err, CoreError::InvariantViolation(_)));
        assert!(err.to_string().contains("Z2"));
        assert_eq!(api.creates(), 0);
        assert_eq!(api.count("update_endpoint"), 0);
    }

    #[tokio::test]
    async fn rejects_rebinding_endpoint_attached_in_other_zone() {
        let api = FakeApi::new();
        seed_volume(&api, "vol-1", "Z1");
        seed_volume(&api, "vol-old", "Z2");
        let rec = EndpointReconciler::new(api.clone(), noop_metrics());

        let mut legacy = EndpointRequest::new("probe-staging", "tpl-1", EndpointConfig::default())
            .with_volume("vol-old");
        legacy.config.zone = Some("Z2".into());
        rec.reconcile(&legacy).await.unwrap();

        let err = rec.reconcile(&request()).await.unwrap_err();
        assert!(matches!(err, CoreError::InvariantViolation(_)));
        assert_eq!(api.count("update_endpoint"), 0);
    }

    #[tokio::test]
    async fn new_template_id_updates_in_place() {
        let api = FakeApi::new();
        seed_volume(&api, "vol-1", "Z1");
        let rec = EndpointReconciler::new(api.clone(), noop_metrics());

        let first = rec.reconcile(&request()).await.unwrap();
        let unchanged = rec.reconcile(&request()).await.unwrap();
        assert_eq!(unchanged.action, ReconcileAction::Unchanged);

        let mut req = request();
        req.template_id = "tpl-2".into();
        req.config.workers_max = 3;
        let updated = rec.reconcile(&req).await.unwrap();
        assert_eq!(updated.action, ReconcileAction::Updated);
        assert_eq!(updated.record.id, first.record.id);
        assert_eq!(updated.record.template_id, "tpl-2");
        assert_eq!(updated.record.workers_max, 3);
        assert_eq!(api.count("create_endpoint"), 1);
    }

    #[tokio::test]
    async fn without_volume_uses_requested_zone() {
        let api = FakeApi::new();
        let rec = EndpointReconciler::new(api.clone(), noop_metrics());

        let mut cfg = EndpointConfig::default();
        cfg.zone = Some("Z3".into());
        let out = rec
            .reconcile(&EndpointRequest::new("probe-dev", "tpl-1", cfg))
            .await
            .unwrap();
        assert_eq!(out.record.zone(), Some("Z3"));
        assert!(out.record.network_volume_id.is_none());
        assert_eq!(api.count("get_volume"), 0);
    }

    #[tokio::test]
    async fn observe_maps_worker_counts() {
        let api = FakeApi::new();
        api.state().health.workers = WorkerCounts {
            running: 1,
            ..Default::default()
        };
        let rec = EndpointReconciler::new(api.clone(), noop_metrics());
        assert_eq!(rec.observe("ep-1").await, Some(EndpointState::Active));

        api.fail_once(
            "endpoint_health",
            crate::api::ApiError::transient("endpoint_health", "503").exhausted(5),
        );
        assert_eq!(rec.observe("ep-1").await, None);
    }
}

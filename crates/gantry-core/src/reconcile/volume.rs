use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use gantry_model::{Volume, VolumeSpec};

use crate::{
    api::ResourceApi,
    error::CoreError,
    metrics::MetricsHandle,
    reconcile::{ReconcileAction, Reconciled, pick_existing},
};

/// Ensures exactly one persistent volume exists per environment.
///
/// A volume is never modified once it exists: it holds the environment's data and its
/// zone pins every endpoint attached to it.
#[derive(Clone)]
pub struct VolumeReconciler {
    api: Arc<dyn ResourceApi>,
    metrics: MetricsHandle,
}

impl VolumeReconciler {
    pub fn new(api: Arc<dyn ResourceApi>, metrics: MetricsHandle) -> Self {
        Self { api, metrics }
    }

    #[instrument(level = "debug", skip(self, spec), fields(volume = %spec.name, zone = %spec.zone))]
    pub async fn reconcile(&self, spec: &VolumeSpec) -> Result<Reconciled<Volume>, CoreError> {
        let found = self.api.list_volumes(&spec.name).await?;

        let out = match pick_existing(&spec.name, found) {
            Some(vol) => {
                if vol.zone != spec.zone {
                    warn!(
                        id = %vol.id,
                        existing_zone = %vol.zone,
                        "volume lives in another zone; keeping it, the endpoint follows the volume"
                    );
                }
                if vol.size != spec.size {
                    warn!(
                        id = %vol.id,
                        existing_gb = vol.size,
                        desired_gb = spec.size,
                        "volume size differs; volumes are never resized"
                    );
                }
                debug!(id = %vol.id, "reusing existing volume");
                Reconciled::new(vol, ReconcileAction::Reused)
            }
            None => {
                let vol = self.api.create_volume(spec).await?;
                info!(id = %vol.id, size_gb = vol.size, "created volume");
                Reconciled::new(vol, ReconcileAction::Created)
            }
        };

        self.metrics
            .record_resource_action("volume", out.action.as_label());
        Ok(out)
    }
}

use std::sync::Arc;

use tracing::{debug, info, instrument};

use gantry_model::{Template, TemplateSpec};

use crate::{
    api::ResourceApi,
    error::CoreError,
    metrics::MetricsHandle,
    reconcile::{ReconcileAction, Reconciled, pick_existing},
};

/// Keeps the environment's container template on the requested image.
///
/// The template is rewritten in place so its id, and every endpoint pointing at it,
/// survives a rollout.
#[derive(Clone)]
pub struct TemplateReconciler {
    api: Arc<dyn ResourceApi>,
    metrics: MetricsHandle,
}

impl TemplateReconciler {
    pub fn new(api: Arc<dyn ResourceApi>, metrics: MetricsHandle) -> Self {
        Self { api, metrics }
    }

    #[instrument(
        level = "debug",
        skip(self, spec),
        fields(template = %spec.name, image = %spec.image_name, env_keys = spec.env.len())
    )]
    pub async fn reconcile(&self, spec: &TemplateSpec) -> Result<Reconciled<Template>, CoreError> {
        let found = self.api.list_templates(&spec.name).await?;

        let out = match pick_existing(&spec.name, found) {
            Some(existing) if spec.matches(&existing) => {
                debug!(id = %existing.id, "template already up to date");
                Reconciled::new(existing, ReconcileAction::Unchanged)
            }
            Some(existing) => {
                let updated = self.api.update_template(&existing.id, spec).await?;
                info!(
                    id = %updated.id,
                    from = %existing.image_name,
                    to = %updated.image_name,
                    "updated template in place"
                );
                Reconciled::new(updated, ReconcileAction::Updated)
            }
            None => {
                let created = self.api.create_template(spec).await?;
                info!(id = %created.id, "created template");
                Reconciled::new(created, ReconcileAction::Created)
            }
        };

        self.metrics
            .record_resource_action("template", out.action.as_label());
        Ok(out)
    }
}

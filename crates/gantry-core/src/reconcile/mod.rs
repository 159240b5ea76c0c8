//! Converge each remote resource tier toward its desired record.
//!
//! Every reconciler follows the same cycle: look the record up by its deterministic
//! name, create it when absent, rewrite it in place when it drifted, and otherwise
//! leave it alone. Names are the only identity, so reruns with the same input
//! perform no writes.
use std::fmt;

use tracing::warn;

use gantry_model::{Endpoint, Template, Volume};

mod volume;
pub use volume::VolumeReconciler;

mod template;
pub use template::TemplateReconciler;

mod endpoint;
pub use endpoint::{EndpointReconciler, EndpointRequest};

/// What a reconciler did to reach the desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Created,
    Updated,
    /// Existing record already matched; nothing was written.
    Unchanged,
    /// Existing volume adopted as-is.
    Reused,
}

impl ReconcileAction {
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            ReconcileAction::Created => "created",
            ReconcileAction::Updated => "updated",
            ReconcileAction::Unchanged => "unchanged",
            ReconcileAction::Reused => "reused",
        }
    }

    /// Returns `true` if the action wrote to the control plane.
    #[inline]
    pub fn is_write(&self) -> bool {
        matches!(self, ReconcileAction::Created | ReconcileAction::Updated)
    }
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Remote record after reconciliation, with the action that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<T> {
    pub record: T,
    pub action: ReconcileAction,
}

impl<T> Reconciled<T> {
    pub fn new(record: T, action: ReconcileAction) -> Self {
        Self { record, action }
    }
}

/// Remote records addressed by name.
pub(crate) trait Named {
    const KIND: &'static str;
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

impl Named for Volume {
    const KIND: &'static str = "volume";
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Template {
    const KIND: &'static str = "template";
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Endpoint {
    const KIND: &'static str = "endpoint";
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// Select the record to manage among those listed under `name`.
///
/// Several records can share a name after an interrupted earlier run. The one with the
/// smallest id is managed; the rest are reported and left untouched.
pub(crate) fn pick_existing<T: Named>(name: &str, mut found: Vec<T>) -> Option<T> {
    found.retain(|r| r.name() == name);
    found.sort_by(|a, b| a.id().cmp(b.id()));

    if found.len() > 1 {
        let ignored: Vec<&str> = found[1..].iter().map(Named::id).collect();
        warn!(
            kind = T::KIND,
            name,
            chosen = found[0].id(),
            ignored = ?ignored,
            "several records share one name; managing the smallest id"
        );
    }
    found.into_iter().next()
}

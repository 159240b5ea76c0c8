pub mod api;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod reconcile;
pub mod verify;

#[cfg(test)]
pub(crate) mod testkit;

pub use error::CoreError;
pub use pipeline::{Deployer, PipelineOutcome, PipelineReport, Stage, StageFailure, Verification};

pub mod prelude {
    pub use crate::api::{ApiError, ApiErrorKind, ApiResult, ResourceApi};
    pub use crate::error::CoreError;
    pub use crate::metrics::{MetricsBackend, MetricsHandle, StageOutcome};
    pub use crate::pipeline::{Deployer, PipelineOutcome};
    pub use crate::reconcile::{ReconcileAction, Reconciled};
}

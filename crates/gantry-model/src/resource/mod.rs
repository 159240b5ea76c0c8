mod volume;
pub use volume::{Volume, VolumeSpec};

mod template;
pub use template::{Template, TemplateSpec};

mod endpoint;
pub use endpoint::{Endpoint, EndpointSpec, ScalerKind};

mod health;
pub use health::{EndpointHealth, EndpointState, JobCounts, WorkerCounts};

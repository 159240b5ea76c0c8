mod status;
pub use status::JobStatus;

#[allow(clippy::module_inception)]
mod job;
pub use job::{Job, error_text};

mod request;
pub use request::{SubmitMode, WorkloadRequest};

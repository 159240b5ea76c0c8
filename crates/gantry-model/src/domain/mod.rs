mod opaque;
pub use opaque::Opaque;

mod env;
pub use env::Env;

mod environment;
pub use environment::Environment;

mod constants;
pub use constants::{ENVIRONMENT_MAX_LEN, REDACTED, VOLUME_NAME_PREFIX};

/// Remote resource identifier assigned by the control plane.
pub type ResourceId = String;

/// Placement zone (data center) identifier, e.g. `EU-RO-1`.
pub type Zone = String;

/// Timeout value in milliseconds.
pub type TimeoutMs = u64;

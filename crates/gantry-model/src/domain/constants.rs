//! Common model-level constants.
//!
//! Naming prefixes and limits shared by the model and the reconcilers.

/// Prefix of the persistent volume name (`storage-{env}`).
pub const VOLUME_NAME_PREFIX: &str = "storage";

/// Maximum length of an environment name.
///
/// Keeps derived resource names inside the control plane's name limits.
pub const ENVIRONMENT_MAX_LEN: usize = 63;

/// Replacement text used when an injected value is scrubbed from a message.
pub const REDACTED: &str = "***";

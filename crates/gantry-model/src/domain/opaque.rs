use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::constants::REDACTED;

/// String value that must never appear in logs or error messages.
///
/// `Debug` and `Display` print a fixed placeholder. The content is reachable
/// only through [`Opaque::expose`], which keeps every read site greppable.
/// Serialization writes the real value: it is what goes over the wire.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Opaque(String);

impl Opaque {
    /// Wrap a value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the real value.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the wrapped value is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Opaque {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Opaque {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

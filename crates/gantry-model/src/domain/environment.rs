use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    domain::constants::{ENVIRONMENT_MAX_LEN, VOLUME_NAME_PREFIX},
    error::{ModelError, ModelResult},
};

/// Logical deployment target (e.g. `production`, `staging`, `development`).
///
/// The environment name is the only input to resource naming: every resource
/// the pipeline manages derives its name from it, so two environments never
/// touch each other's records.
///
/// Names are lowercase ASCII alphanumerics and `-`, at most 63 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Environment(String);

impl Environment {
    /// Validate and wrap an environment name.
    pub fn new(name: impl Into<String>) -> ModelResult<Self> {
        Self::try_from(name.into())
    }

    /// Raw environment name.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deterministic persistent volume name: `storage-{env}`.
    pub fn volume_name(&self) -> String {
        format!("{VOLUME_NAME_PREFIX}-{}", self.0)
    }

    /// Deterministic template name: `{workload}-{env}`.
    pub fn template_name(&self, workload: &str) -> String {
        format!("{workload}-{}", self.0)
    }

    /// Deterministic endpoint name: `{workload}-{env}`.
    ///
    /// Templates and endpoints live in separate namespaces, so sharing the
    /// name keeps the pair easy to find in the console.
    pub fn endpoint_name(&self, workload: &str) -> String {
        format!("{workload}-{}", self.0)
    }
}

impl TryFrom<String> for Environment {
    type Error = ModelError;
    fn try_from(s: String) -> ModelResult<Self> {
        let valid = !s.is_empty()
            && s.len() <= ENVIRONMENT_MAX_LEN
            && !s.starts_with('-')
            && !s.ends_with('-')
            && s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(ModelError::InvalidEnvironment(s));
        }
        Ok(Self(s))
    }
}

impl FromStr for Environment {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        Self::try_from(s.trim().to_string())
    }
}

impl From<Environment> for String {
    fn from(e: Environment) -> Self {
        e.0
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

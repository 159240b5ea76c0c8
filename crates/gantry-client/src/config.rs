use serde::{Deserialize, Serialize};

use gantry_model::{Opaque, TimeoutMs};

use crate::retry::RetryPolicy;

pub const DEFAULT_REST_URL: &str = "https://rest.runpod.io/v1/";
pub const DEFAULT_JOBS_URL: &str = "https://api.runpod.ai/v2/";

/// Remote client settings.
///
/// The api key is never read from or written to config files; the binary takes it
/// from the environment.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Control-plane base url.
    pub rest_url: String,
    /// Serverless job api base url.
    pub jobs_url: String,
    #[serde(skip)]
    pub api_key: Opaque,
    /// Per-request timeout of control-plane calls.
    pub timeout_ms: TimeoutMs,
    /// Per-request timeout of synchronous job submissions.
    pub sync_timeout_ms: TimeoutMs,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rest_url: DEFAULT_REST_URL.to_string(),
            jobs_url: DEFAULT_JOBS_URL.to_string(),
            api_key: Opaque::default(),
            timeout_ms: 30_000,
            sync_timeout_ms: 120_000,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_api_key(mut self, key: impl Into<Opaque>) -> Self {
        self.api_key = key.into();
        self
    }
}

use serde::{Deserialize, Serialize};

/// Capped exponential backoff between retry attempts of a remote call.
///
/// The delay before retry `n` (1-based) is `min(max_ms, first_ms * factor^(n-1))`,
/// then shaped by `jitter`. The math lives in the client; this only carries the policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackoffStrategy {
    pub jitter: super::JitterStrategy,
    pub first_ms: u64,
    pub max_ms: u64,
    pub factor: f64,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self {
            jitter: super::JitterStrategy::Full,
            first_ms: 1_000,
            max_ms: 16_000,
            factor: 2.0,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Controls how random jitter is applied to backoff delays.
///
/// Jitter spreads retries of concurrent pipeline runs over time so they do not hit a
/// recovering control plane in lockstep.
///
/// Strategies:
/// - `None`: No jitter. Backoff durations are deterministic.
/// - `Full`: Full jitter, picks a random delay in `[0, base]`.
/// - `Equal`: Equal jitter, picks a delay in `[base/2, base]`.
/// - `Decorrelated`: picks a delay in `[first, previous * 3]`, capped at `max`.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JitterStrategy {
    /// No randomness applied.
    None,
    /// Delay is uniformly sampled from `[0, base]`.
    #[default]
    Full,
    /// Delay is sampled from `[base / 2, base]`.
    Equal,
    /// Delay is sampled from `[first, previous * 3]`, capped.
    Decorrelated,
}

impl FromStr for JitterStrategy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" => Ok(JitterStrategy::Equal),
            "none" => Ok(JitterStrategy::None),
            "" | "full" | "default" => Ok(JitterStrategy::Full),
            "decorrelated" => Ok(JitterStrategy::Decorrelated),
            other => Err(ModelError::UnknownJitter(other.to_string())),
        }
    }
}

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use gantry_model::{BackoffStrategy, JitterStrategy};

/// Attempt budget and delay shape for transient failures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Total attempts per call, the first one included.
    pub attempts: u32,
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff: BackoffStrategy::default(),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows failed attempt `attempt` (1-based).
    ///
    /// `prev` is the previous delay (decorrelated jitter grows from it) and
    /// `retry_after` a server-requested minimum. The result never exceeds `max_ms`.
    pub fn delay<R: Rng + ?Sized>(
        &self,
        attempt: u32,
        prev: Duration,
        retry_after: Option<Duration>,
        rng: &mut R,
    ) -> Duration {
        let b = &self.backoff;
        let first = b.first_ms.max(1);
        let max = b.max_ms.max(first);

        let exp = b.factor.max(1.0).powi(attempt.saturating_sub(1).min(63) as i32);
        let base = ((first as f64) * exp).min(max as f64) as u64;

        let ms = match b.jitter {
            JitterStrategy::None => base,
            JitterStrategy::Full => rng.random_range(0..=base),
            JitterStrategy::Equal => base / 2 + rng.random_range(0..=base - base / 2),
            JitterStrategy::Decorrelated => {
                let prev = (prev.as_millis() as u64).max(first);
                let upper = prev.saturating_mul(3).min(max);
                rng.random_range(first..=upper.max(first))
            }
        };

        let floor = retry_after.map_or(0, |d| d.as_millis() as u64);
        Duration::from_millis(ms.max(floor).min(max))
    }

    /// First delay, used to seed decorrelated jitter.
    pub fn initial(&self) -> Duration {
        Duration::from_millis(self.backoff.first_ms)
    }
}

//! Per-environment single-flight guard.
//!
//! Two runs for the same environment would race their list-then-create pairs and
//! can leave duplicate records behind. Runs for different environments never touch
//! the same names and are admitted independently.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use gantry_model::{AdmissionStrategy, Environment};

use crate::error::CoreError;

#[derive(Default)]
struct Slot {
    gate: Arc<AsyncMutex<()>>,
    /// Cancellation handle of the run currently holding `gate`.
    running: Mutex<Option<CancellationToken>>,
}

/// Admission table keyed by environment.
#[derive(Clone, Default)]
pub struct AdmissionTable {
    slots: Arc<Mutex<HashMap<Environment, Arc<Slot>>>>,
}

/// Exclusive right to run the pipeline for one environment. Released on drop.
pub struct AdmissionPermit {
    slot: Arc<Slot>,
    _gate: OwnedMutexGuard<()>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        *lock(&self.slot.running) = None;
    }
}

impl AdmissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a run currently holds `env`.
    pub fn is_running(&self, env: &Environment) -> bool {
        lock(&self.slots)
            .get(env)
            .is_some_and(|slot| lock(&slot.running).is_some())
    }

    /// Admit a run for `env` according to `strategy`.
    ///
    /// `token` is the run's own cancellation handle; a later `Replace` admission cancels it.
    pub async fn admit(
        &self,
        env: &Environment,
        strategy: AdmissionStrategy,
        token: &CancellationToken,
    ) -> Result<AdmissionPermit, CoreError> {
        let slot = self.slot(env);

        let gate = match strategy {
            AdmissionStrategy::DropIfRunning => slot
                .gate
                .clone()
                .try_lock_owned()
                .map_err(|_| CoreError::Busy(env.to_string()))?,
            AdmissionStrategy::Queue => wait(&slot, token).await?,
            AdmissionStrategy::Replace => {
                if let Some(running) = lock(&slot.running).as_ref() {
                    info!(env = %env, "cancelling in-flight run to replace it");
                    running.cancel();
                }
                wait(&slot, token).await?
            }
        };

        debug!(env = %env, strategy = ?strategy, "run admitted");
        *lock(&slot.running) = Some(token.clone());
        Ok(AdmissionPermit { slot, _gate: gate })
    }

    fn slot(&self, env: &Environment) -> Arc<Slot> {
        lock(&self.slots).entry(env.clone()).or_default().clone()
    }
}

async fn wait(slot: &Slot, token: &CancellationToken) -> Result<OwnedMutexGuard<()>, CoreError> {
    tokio::select! {
        biased;
        gate = slot.gate.clone().lock_owned() => Ok(gate),
        _ = token.cancelled() => Err(CoreError::Cancelled),
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn env(name: &str) -> Environment {
        name.parse().unwrap()
    }

    #[tokio::test]
    async fn drop_if_running_rejects_second_run() {
        let table = AdmissionTable::new();
        let _first = table
            .admit(&env("staging"), AdmissionStrategy::Queue, &CancellationToken::new())
            .await
            .unwrap();
        assert!(table.is_running(&env("staging")));

        let err = table
            .admit(&env("staging"), AdmissionStrategy::DropIfRunning, &CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::Busy(ref e) if e == "staging"));
    }

    #[tokio::test]
    async fn different_environments_run_in_parallel() {
        let table = AdmissionTable::new();
        let _a = table
            .admit(&env("staging"), AdmissionStrategy::DropIfRunning, &CancellationToken::new())
            .await
            .unwrap();
        let _b = table
            .admit(&env("production"), AdmissionStrategy::DropIfRunning, &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn queue_waits_for_release() {
        let table = AdmissionTable::new();
        let first = table
            .admit(&env("staging"), AdmissionStrategy::Queue, &CancellationToken::new())
            .await
            .unwrap();

        let waiter = {
            let table = table.clone();
            tokio::spawn(async move {
                table
                    .admit(&env("staging"), AdmissionStrategy::Queue, &CancellationToken::new())
                    .await
                    .map(|_| ())
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap().unwrap();
        assert!(!table.is_running(&env("staging")));
    }

    #[tokio::test(start_paused = true)]
    async fn replace_cancels_running_token() {
        let table = AdmissionTable::new();
        let running = CancellationToken::new();
        let first = table
            .admit(&env("staging"), AdmissionStrategy::Queue, &running)
            .await
            .unwrap();

        let replacer = {
            let table = table.clone();
            tokio::spawn(async move {
                table
                    .admit(&env("staging"), AdmissionStrategy::Replace, &CancellationToken::new())
                    .await
                    .map(|_| ())
            })
        };
        running.cancelled().await;
        drop(first);
        replacer.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cancelled_waiter_gives_up() {
        let table = AdmissionTable::new();
        let _first = table
            .admit(&env("staging"), AdmissionStrategy::Queue, &CancellationToken::new())
            .await
            .unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let err = table
            .admit(&env("staging"), AdmissionStrategy::Queue, &token)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::Cancelled));
    }
}

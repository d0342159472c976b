//! Cancellable delayed tasks keyed by their governing inputs.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct Pending<K> {
    key: K,
    generation: u64,
    token: CancellationToken,
    fired: bool,
}

struct Slot<K> {
    pending: Option<Pending<K>>,
    next_generation: u64,
}

/// Runs at most one job at a time per debouncer.
///
/// A newer job always cancels the previous one, whether it is still waiting
/// out the quiet period or already running, so a superseded job never
/// finishes after its replacement.
pub struct Debouncer<K> {
    quiet: Duration,
    slot: Arc<Mutex<Slot<K>>>,
}

impl<K> Debouncer<K>
where
    K: Clone + PartialEq + Send + 'static,
{
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            slot: Arc::new(Mutex::new(Slot {
                pending: None,
                next_generation: 0,
            })),
        }
    }

    /// Runs `job` once `key` has been stable for the quiet period.
    ///
    /// Returns false when the same key is already waiting, in which case the
    /// existing timer is kept.
    pub fn schedule<F, Fut>(&self, key: K, job: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        {
            let slot = lock(&self.slot);
            if let Some(pending) = &slot.pending {
                if !pending.fired && pending.key == key {
                    return false;
                }
            }
        }
        self.start(key, Some(self.quiet), job);
        true
    }

    /// Runs `job` immediately, cancelling whatever was pending or running.
    pub fn trigger<F, Fut>(&self, key: K, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.start(key, None, job);
    }

    pub fn cancel(&self) {
        let mut slot = lock(&self.slot);
        if let Some(pending) = slot.pending.take() {
            pending.token.cancel();
        }
    }

    /// True while a job is waiting out its quiet period
    pub fn is_waiting(&self) -> bool {
        lock(&self.slot)
            .pending
            .as_ref()
            .is_some_and(|p| !p.fired)
    }

    fn start<F, Fut>(&self, key: K, delay: Option<Duration>, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let generation = {
            let mut slot = lock(&self.slot);
            if let Some(previous) = slot.pending.take() {
                previous.token.cancel();
            }
            let generation = slot.next_generation;
            slot.next_generation += 1;
            slot.pending = Some(Pending {
                key,
                generation,
                token: token.clone(),
                fired: delay.is_none(),
            });
            generation
        };

        let slot = self.slot.clone();
        tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Debounced job {} cancelled before firing", generation);
                        return;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
                {
                    let mut guard = lock(&slot);
                    if let Some(pending) = guard.pending.as_mut() {
                        if pending.generation == generation {
                            pending.fired = true;
                        }
                    }
                }
            }

            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Debounced job {} superseded while running", generation);
                }
                _ = job() => {}
            }

            let mut guard = lock(&slot);
            if guard
                .pending
                .as_ref()
                .is_some_and(|p| p.generation == generation)
            {
                guard.pending = None;
            }
        });
    }
}

impl<K> Drop for Debouncer<K> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            if let Some(pending) = slot.pending.take() {
                pending.token.cancel();
            }
        }
    }
}

fn lock<K>(slot: &Mutex<Slot<K>>) -> MutexGuard<'_, Slot<K>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

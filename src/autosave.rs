//! Debounced persistence for edited documents.
//!
//! Rapid edits are coalesced: every `schedule` replaces the pending value and
//! restarts the idle timer, so only the latest value is persisted once the
//! editor goes quiet. `flush` persists immediately (blur, navigation) and a
//! saver dropped with unsaved changes hands them to a final background save.
//! A value whose save fails stays pending until a newer value replaces it.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type PersistFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;
type PersistFn<T> = Arc<dyn Fn(T) -> PersistFuture + Send + Sync>;

struct PendingSave<T> {
    value: Option<T>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

pub struct AutoSaver<T: Clone + Send + 'static> {
    delay: Duration,
    state: Arc<Mutex<PendingSave<T>>>,
    persist: PersistFn<T>,
}

impl<T: Clone + Send + 'static> AutoSaver<T> {
    pub fn new<F, Fut>(delay: Duration, persist: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let persist: PersistFn<T> = Arc::new(move |value| -> PersistFuture { Box::pin(persist(value)) });
        Self {
            delay,
            state: Arc::new(Mutex::new(PendingSave {
                value: None,
                timer: None,
                generation: 0,
            })),
            persist,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn has_pending(&self) -> bool {
        lock(&self.state).value.is_some()
    }

    /// Replaces the pending value and restarts the idle timer.
    ///
    /// Outside a tokio runtime the value stays pending until `flush`.
    pub fn schedule(&self, value: T) {
        let mut state = lock(&self.state);
        state.value = Some(value);
        state.generation += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                debug!("no runtime for auto-save timer; waiting for explicit flush");
                return;
            }
        };

        let generation = state.generation;
        let shared = Arc::clone(&self.state);
        let persist = Arc::clone(&self.persist);
        let delay = self.delay;
        state.timer = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let value = {
                let mut state = lock(&shared);
                if state.generation != generation {
                    return;
                }
                state.timer = None;
                state.value.take()
            };
            if let Some(value) = value {
                match persist(value.clone()).await {
                    Ok(()) => info!("auto-save completed"),
                    Err(err) => {
                        warn!(error = %err, "auto-save failed; keeping changes pending");
                        restore_pending(&shared, value);
                    }
                }
            }
        }));
    }

    /// Cancels the idle timer and persists any pending value now.
    /// Returns whether anything was saved. On failure the value is pending
    /// again, so a later `flush` retries it.
    pub async fn flush(&self) -> Result<bool, String> {
        let value = match take_pending(&self.state) {
            Some(value) => value,
            None => return Ok(false),
        };
        if let Err(err) = (self.persist)(value.clone()).await {
            warn!(error = %err, "flush failed; keeping changes pending");
            restore_pending(&self.state, value);
            return Err(err);
        }
        info!("pending changes flushed");
        Ok(true)
    }

    /// Flushes and consumes the saver.
    pub async fn shutdown(self) -> Result<bool, String> {
        self.flush().await
    }
}

impl<T: Clone + Send + 'static> Drop for AutoSaver<T> {
    fn drop(&mut self) {
        let value = match take_pending(&self.state) {
            Some(value) => value,
            None => return,
        };
        match Handle::try_current() {
            Ok(handle) => {
                let persist = Arc::clone(&self.persist);
                handle.spawn(async move {
                    if let Err(err) = persist(value).await {
                        warn!(error = %err, "final auto-save failed");
                    }
                });
            }
            Err(_) => warn!("auto-saver dropped outside a runtime; unsaved changes lost"),
        }
    }
}

fn take_pending<T>(state: &Mutex<PendingSave<T>>) -> Option<T> {
    let mut state = lock(state);
    state.generation += 1;
    if let Some(timer) = state.timer.take() {
        timer.abort();
    }
    state.value.take()
}

/// Puts a value back after a failed save unless a newer one was scheduled.
fn restore_pending<T>(state: &Mutex<PendingSave<T>>, value: T) {
    let mut state = lock(state);
    if state.value.is_none() {
        state.value = Some(value);
    }
}

fn lock<T>(state: &Mutex<PendingSave<T>>) -> MutexGuard<'_, PendingSave<T>> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

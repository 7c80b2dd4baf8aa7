//! Last-write-wins debounce of resolver calls.
//!
//! Every debounced call is a task that sleeps for the debounce interval and
//! then runs its work. The registry maps each logical request key to the
//! latest task for it. Scheduling a newer call for the same key aborts the
//! older task and drops its waiter, so the superseded caller never receives
//! an outcome. A generation number checked on completion guards against an
//! older task that finished just as it was superseded.
//!
//! A task that unwinds before producing an outcome still releases its entry
//! and fails its caller with [`ResolverError::Interrupted`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{ResolverError, Result};
use crate::response::ValuesPage;

pub(crate) type Outcome = Result<ValuesPage>;

struct Pending {
    generation: u64,
    waiter: oneshot::Sender<Outcome>,
    abort: AbortHandle,
}

#[derive(Default)]
struct State {
    next_generation: u64,
    entries: HashMap<String, Pending>,
    closed: bool,
}

/// Per-resolver table of debounced calls in flight, keyed by request key.
#[derive(Clone, Default)]
pub(crate) struct PendingRegistry {
    state: Arc<Mutex<State>>,
}

impl std::fmt::Debug for PendingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("PendingRegistry")
            .field("pending", &state.entries.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl PendingRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    /// Number of debounced calls not yet completed.
    pub(crate) fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Run `work` after `delay` unless superseded, replacing any call pending
    /// under `key`. The receiver yields the outcome, or a receive error if
    /// this call is itself superseded later.
    pub(crate) fn schedule<F>(
        &self,
        key: String,
        delay: Duration,
        work: F,
    ) -> Result<oneshot::Receiver<Outcome>>
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let mut state = self.lock();
        if state.closed {
            return Err(ResolverError::Shutdown);
        }
        let generation = state.next_generation;
        state.next_generation += 1;

        let deadline = Instant::now() + delay;
        let (waiter, receiver) = oneshot::channel();
        let mut completion = Completion {
            state: Arc::clone(&self.state),
            key: key.clone(),
            generation,
            outcome: None,
        };
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            completion.outcome = Some(work.await);
        });

        let pending = Pending {
            generation,
            waiter,
            abort: handle.abort_handle(),
        };
        if let Some(previous) = state.entries.insert(key.clone(), pending) {
            previous.abort.abort();
            debug!(
                key = %key,
                superseded = previous.generation,
                generation,
                "debounced call superseded"
            );
        }
        Ok(receiver)
    }

    /// Abort every pending call, fail its caller with
    /// [`ResolverError::Shutdown`], and refuse new calls.
    pub(crate) fn shutdown(&self) {
        let drained: Vec<Pending> = {
            let mut state = self.lock();
            state.closed = true;
            state.entries.drain().map(|(_, pending)| pending).collect()
        };
        if !drained.is_empty() {
            debug!(pending = drained.len(), "shutting down debounced calls");
        }
        for pending in drained {
            pending.abort.abort();
            let _ = pending.waiter.send(Err(ResolverError::Shutdown));
        }
    }
}

/// Owned by a debounce task; delivers its outcome when the task ends.
///
/// Runs on normal completion, on abort, and while unwinding from a panic in
/// the work. Only the generation still registered under the key is answered,
/// so aborts from supersede or shutdown find nothing to deliver.
struct Completion {
    state: Arc<Mutex<State>>,
    key: String,
    generation: u64,
    outcome: Option<Outcome>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        let waiter = {
            let mut state = lock(&self.state);
            match state.entries.get(&self.key) {
                Some(pending) if pending.generation == self.generation => {
                    state.entries.remove(&self.key).map(|pending| pending.waiter)
                }
                _ => None,
            }
        };
        let Some(waiter) = waiter else {
            if self.outcome.is_some() {
                debug!(key = %self.key, generation = self.generation, "discarding superseded result");
            }
            return;
        };
        let outcome = self.outcome.take().unwrap_or_else(|| {
            warn!(key = %self.key, generation = self.generation, "debounced call ended without a result");
            Err(ResolverError::Interrupted {
                key: self.key.clone(),
            })
        });
        // The caller may have dropped its future; nothing to do then.
        let _ = waiter.send(outcome);
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

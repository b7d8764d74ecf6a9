//! Tokio-backed timer host.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::trace;

use crate::core::{Action, CallId, DelayCaller, Enqueuer};

/// A [`DelayCaller`] that sleeps on a tokio runtime and hands fired callbacks
/// to an [`Enqueuer`].
///
/// The cancellation check happens inside the enqueued action, on the dispatch
/// context, so a call cancelled from that context never runs even if its timer
/// already expired and the action is sitting in the queue.
pub struct TokioDelayCaller {
    runtime: Handle,
    enqueuer: Arc<dyn Enqueuer>,
    next_id: AtomicU64,
    timers: Arc<Mutex<HashMap<CallId, AbortHandle>>>,
}

impl TokioDelayCaller {
    /// Create a timer host on the given runtime.
    pub fn new(runtime: Handle, enqueuer: Arc<dyn Enqueuer>) -> Self {
        Self {
            runtime,
            enqueuer,
            next_id: AtomicU64::new(0),
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a timer host on the runtime the caller is running in.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current(enqueuer: Arc<dyn Enqueuer>) -> Self {
        Self::new(Handle::current(), enqueuer)
    }

    /// Number of calls that have not fired or been cancelled.
    pub fn pending(&self) -> usize {
        self.timers.lock().len()
    }
}

impl DelayCaller for TokioDelayCaller {
    fn delay_call(&self, delay: Duration, callback: Action) -> CallId {
        let id = CallId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let enqueuer = Arc::clone(&self.enqueuer);
        let timers = Arc::clone(&self.timers);

        // Held across spawn so the fired action cannot look the id up before it exists
        let mut pending = self.timers.lock();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            enqueuer.enqueue(Box::new(move || {
                let live = timers.lock().remove(&id).is_some();
                if live {
                    callback();
                } else {
                    trace!(%id, "delayed call cancelled after expiry");
                }
            }));
        });
        pending.insert(id, task.abort_handle());
        id
    }

    fn cancel_delay_call(&self, id: CallId) {
        if let Some(task) = self.timers.lock().remove(&id) {
            task.abort();
        }
    }
}

impl std::fmt::Debug for TokioDelayCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioDelayCaller")
            .field("pending", &self.pending())
            .finish()
    }
}

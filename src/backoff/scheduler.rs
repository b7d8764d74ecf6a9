//! Exponential backoff with a single pending timer.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::core::{Action, CallId, DelayCaller, MAX_DELAY_FACTOR};

/// Snapshot of the scheduler's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffRecord {
    /// First delay after a success.
    pub min_delay: Duration,
    /// Ceiling for the delay.
    pub max_delay: Duration,
    /// Delay the next failure will use.
    pub current_delay: Duration,
    /// Failures since the last success.
    pub failure_count: u32,
    /// Outstanding retry timer, if any.
    pub pending: Option<CallId>,
}

#[derive(Debug)]
struct State {
    record: BackoffRecord,
    /// Bumped on every schedule so a fired timer only clears its own marker.
    generation: u64,
}

/// Backoff scheduler.
///
/// Owns at most one retry timer on a [`DelayCaller`]. Reporting a failure with a
/// callback cancels any outstanding timer before scheduling the new one, so the
/// previous callback never fires.
pub struct BackoffScheduler {
    state: Arc<Mutex<State>>,
    caller: Arc<dyn DelayCaller>,
}

impl BackoffScheduler {
    /// Create a scheduler with `max_delay = 10 × min_delay`.
    pub fn new(caller: Arc<dyn DelayCaller>, min_delay: Duration) -> Self {
        let max_delay = min_delay.saturating_mul(MAX_DELAY_FACTOR);
        Self::with_bounds(caller, min_delay, max_delay)
    }

    /// Create a scheduler with explicit bounds.
    ///
    /// A `max_delay` below `min_delay` is raised to `min_delay`.
    pub fn with_bounds(caller: Arc<dyn DelayCaller>, min_delay: Duration, max_delay: Duration) -> Self {
        let max_delay = max_delay.max(min_delay);
        Self {
            state: Arc::new(Mutex::new(State {
                record: BackoffRecord {
                    min_delay,
                    max_delay,
                    current_delay: min_delay,
                    failure_count: 0,
                    pending: None,
                },
                generation: 0,
            })),
            caller,
        }
    }

    /// Report a failure.
    ///
    /// The delay for this report is the current delay before growth; the current
    /// delay then doubles, capped at the maximum. With a callback, any pending
    /// retry is cancelled and `callback` is scheduled after that delay, which is
    /// returned. Without one, nothing is scheduled and the grown current delay is
    /// returned, for callers that run their own timer.
    pub fn on_failure(&self, callback: Option<Action>) -> Duration {
        let mut state = self.state.lock();
        let record = &mut state.record;

        record.failure_count = record.failure_count.saturating_add(1);
        let delay = record.current_delay;
        record.current_delay = delay.saturating_add(delay).min(record.max_delay);

        let Some(callback) = callback else {
            trace!(
                failures = record.failure_count,
                delay_ms = record.current_delay.as_millis() as u64,
                "backoff queried"
            );
            return record.current_delay;
        };

        if let Some(previous) = record.pending.take() {
            self.caller.cancel_delay_call(previous);
        }

        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;
        let weak = Arc::downgrade(&self.state);
        let id = self
            .caller
            .delay_call(delay, Box::new(move || fire(weak, generation, callback)));
        state.record.pending = Some(id);

        debug!(
            failures = state.record.failure_count,
            delay_ms = delay.as_millis() as u64,
            %id,
            "retry scheduled"
        );
        delay
    }

    /// Report a failure and schedule `callback` as the retry.
    pub fn retry_after_failure<F>(&self, callback: F) -> Duration
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_failure(Some(Box::new(callback)))
    }

    /// Report a success: cancel any pending retry and reset the delay and count.
    pub fn on_success(&self) {
        let mut state = self.state.lock();
        if let Some(id) = state.record.pending.take() {
            self.caller.cancel_delay_call(id);
        }
        state.record.failure_count = 0;
        state.record.current_delay = state.record.min_delay;
        trace!("backoff reset");
    }

    /// Cancel any pending retry without touching the delay or count.
    pub fn cancel(&self) {
        if let Some(id) = self.state.lock().record.pending.take() {
            self.caller.cancel_delay_call(id);
            debug!(%id, "retry cancelled");
        }
    }

    /// Whether a retry timer is currently scheduled.
    pub fn pending(&self) -> bool {
        self.state.lock().record.pending.is_some()
    }

    /// Failures since the last success.
    pub fn failure_count(&self) -> u32 {
        self.state.lock().record.failure_count
    }

    /// Delay the next failure will use.
    pub fn current_delay(&self) -> Duration {
        self.state.lock().record.current_delay
    }

    /// Configured minimum delay.
    pub fn min_delay(&self) -> Duration {
        self.state.lock().record.min_delay
    }

    /// Configured maximum delay.
    pub fn max_delay(&self) -> Duration {
        self.state.lock().record.max_delay
    }

    /// Copy of the full bookkeeping.
    pub fn record(&self) -> BackoffRecord {
        self.state.lock().record.clone()
    }
}

/// Timer body: clear the pending marker, then run the user callback.
fn fire(state: Weak<Mutex<State>>, generation: u64, callback: Action) {
    if let Some(state) = state.upgrade() {
        let mut state = state.lock();
        if state.generation == generation {
            state.record.pending = None;
        }
    }
    callback();
}

impl Drop for BackoffScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for BackoffScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackoffScheduler")
            .field("record", &self.record())
            .finish()
    }
}

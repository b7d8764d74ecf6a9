//! Deterministic timer host.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::{Action, CallId, DelayCaller};

/// A [`DelayCaller`] whose time only moves when [`advance`](Self::advance) is called.
///
/// Due callbacks run on the thread calling `advance`, in deadline order (ties
/// broken by scheduling order). Useful for driving retry policy in tests and
/// in frame-stepped hosts that keep their own clock.
#[derive(Default)]
pub struct ManualClock {
    inner: Mutex<ClockState>,
}

#[derive(Default)]
struct ClockState {
    /// Time elapsed since the clock was created.
    now: Duration,
    next_id: u64,
    /// Pending calls keyed by (deadline, id).
    timers: BTreeMap<(Duration, u64), Action>,
    /// Deadline lookup for cancellation.
    deadlines: HashMap<u64, Duration>,
}

impl ManualClock {
    /// Create a clock at time zero with nothing scheduled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.inner.lock().now
    }

    /// Number of calls still waiting to fire.
    pub fn pending(&self) -> usize {
        self.inner.lock().timers.len()
    }

    /// Deadline of the earliest pending call, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.inner.lock().timers.keys().next().map(|(due, _)| *due)
    }

    /// Move time forward by `by`, firing every call that becomes due.
    ///
    /// Callbacks may schedule or cancel further calls; a call scheduled inside a
    /// callback fires in the same `advance` if its deadline is still in range.
    /// Returns the number of callbacks fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.inner.lock().now.saturating_add(by);
        let mut fired = 0;

        loop {
            // Lock is released before the callback runs
            let callback = {
                let mut state = self.inner.lock();
                let due = match state.timers.keys().next() {
                    Some(&key) if key.0 <= target => key,
                    _ => break,
                };
                state.deadlines.remove(&due.1);
                state.now = due.0;
                state.timers.remove(&due)
            };

            if let Some(callback) = callback {
                callback();
                fired += 1;
            }
        }

        self.inner.lock().now = target;
        fired
    }
}

impl DelayCaller for ManualClock {
    fn delay_call(&self, delay: Duration, callback: Action) -> CallId {
        let mut state = self.inner.lock();
        let id = state.next_id;
        state.next_id += 1;

        let due = state.now.saturating_add(delay);
        state.timers.insert((due, id), callback);
        state.deadlines.insert(id, due);
        CallId::new(id)
    }

    fn cancel_delay_call(&self, id: CallId) {
        let mut state = self.inner.lock();
        if let Some(due) = state.deadlines.remove(&id.get()) {
            state.timers.remove(&(due, id.get()));
        }
    }
}

impl std::fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("ManualClock")
            .field("now", &state.now)
            .field("pending", &state.timers.len())
            .finish()
    }
}

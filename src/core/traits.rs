//! Host capabilities.
//!
//! The transport and the backoff scheduler never spawn threads or timers on
//! their own. Everything time- or thread-related goes through these two traits,
//! which the embedding application implements (or takes from [`crate::host`]).

use std::fmt;
use std::time::Duration;

/// A unit of deferred work.
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// Serialization point for application-visible callbacks.
///
/// Every transport callback and every backoff retry is handed to an `Enqueuer`
/// instead of being run on the network task that produced it, so the
/// application never sees two callbacks at once.
///
/// # Requirements
///
/// - `enqueue` MUST NOT run `action` before returning
/// - actions from the same caller MUST run in the order they were enqueued
pub trait Enqueuer: Send + Sync {
    /// Schedule `action` to run later on the application's dispatch context.
    fn enqueue(&self, action: Action);
}

/// Identifier of a scheduled delayed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

impl CallId {
    /// Wrap a raw id. Hosts hand these out; ids are never reused while pending.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call#{}", self.0)
    }
}

/// Timer host used by the backoff scheduler.
///
/// # Requirements
///
/// - an id MUST NOT be reused while its call is still pending
/// - `cancel_delay_call` MUST prevent the callback iff it has not fired yet
/// - cancelling an unknown or already-fired id is a no-op
pub trait DelayCaller: Send + Sync {
    /// Run `callback` once `delay` has elapsed.
    fn delay_call(&self, delay: Duration, callback: Action) -> CallId;

    /// Cancel a pending call.
    fn cancel_delay_call(&self, id: CallId);
}

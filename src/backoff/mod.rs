//! Signal Relay - Retry scheduling
//!
//! Turns a stream of failure/success reports into at most one pending retry
//! timer. The delay doubles on every failure, starting from the configured
//! minimum and capped at the maximum:
//!
//! ```text
//! failure:   1     2      3      4      5      6
//! delay:    min  2·min  4·min  8·min   ...    max
//! ```
//!
//! The scheduler knows nothing about sockets; it can back off any retryable
//! operation.

mod scheduler;

pub use scheduler::*;

//! Host capability implementations.
//!
//! - [`Dispatcher`] / [`DispatchQueue`]: an [`Enqueuer`](crate::core::Enqueuer)
//!   backed by an unbounded tokio channel, drained by the application
//! - [`ManualClock`]: a deterministic [`DelayCaller`](crate::core::DelayCaller)
//!   that only advances when told to
//! - [`TokioDelayCaller`]: a tokio-timer [`DelayCaller`](crate::core::DelayCaller)
//!   (requires `websocket` feature)

mod dispatch;
mod manual;
#[cfg(feature = "websocket")]
mod timer;

pub use dispatch::*;
pub use manual::ManualClock;
#[cfg(feature = "websocket")]
pub use timer::TokioDelayCaller;

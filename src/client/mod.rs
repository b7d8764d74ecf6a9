//! Signal Relay - Reconnecting Channel
//!
//! [`SignalingChannel`] keeps a signaling connection alive by pairing the
//! single-attempt [`TransportClient`](crate::transport::TransportClient) with a
//! [`BackoffScheduler`](crate::backoff::BackoffScheduler).

mod channel;
mod config;

pub use channel::*;
pub use config::*;

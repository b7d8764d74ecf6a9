//! # Signal Relay
//!
//! An auto-reconnecting control channel for WebRTC signaling.
//!
//! Two peers that want a direct media connection first exchange offers, answers
//! and ICE candidates through a relay server. This crate provides the channel
//! that carries those messages:
//!
//! - **Transport client**: one socket, one lifecycle, four outcomes
//!   (connected, message, error, closed) delivered on a single dispatch context
//! - **Backoff scheduler**: failure/success reports in, at most one retry timer out
//! - **Signaling channel**: the two wired together into a channel that stays alive
//! - **Signaling messages**: the JSON schema shared with browser peers
//!
//! ## Feature Flags
//!
//! - `websocket` (default): tokio-tungstenite connector and tokio timers
//! - `client` (default): [`client::SignalingChannel`] reconnect wrapper
//!
//! ## Modules
//!
//! - [`core`]: Host capability traits, constants, and error types (always included)
//! - [`backoff`]: Exponential retry scheduling (always included)
//! - [`host`]: Dispatch queue and timer implementations
//! - [`transport`]: Connection state machine, socket boundary, transport client
//! - [`signaling`]: Offer/answer/candidate message schema
//! - [`client`]: Reconnecting channel (requires `client` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use signal_relay::prelude::*;
//!
//! let clock = Arc::new(ManualClock::new());
//! let backoff = BackoffScheduler::with_bounds(
//!     clock.clone(),
//!     Duration::from_millis(500),
//!     Duration::from_millis(5000),
//! );
//!
//! // Query mode: nothing is scheduled, the grown delay comes back
//! assert_eq!(backoff.on_failure(None), Duration::from_millis(1000));
//! assert_eq!(backoff.on_failure(None), Duration::from_millis(2000));
//! backoff.on_success();
//! assert_eq!(backoff.failure_count(), 0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

pub mod backoff;
pub mod host;
pub mod signaling;
pub mod transport;

// Reconnecting channel (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    pub use crate::backoff::BackoffScheduler;
    pub use crate::host::{dispatcher, DispatchQueue, Dispatcher, ManualClock};
    pub use crate::signaling::SignalingMessage;
    pub use crate::transport::{
        ConnectionState, Connector, EventSink, Handlers, Payload, SecureTransport,
        SocketEvent, SocketHandle, TransportClient, TransportError, TransportOptions,
        TransportResult,
    };

    #[cfg(feature = "websocket")]
    pub use crate::host::TokioDelayCaller;
    #[cfg(feature = "websocket")]
    pub use crate::transport::WsConnector;

    #[cfg(feature = "client")]
    pub use crate::client::{ChannelConfig, ChannelConfigBuilder, SignalingChannel};
}

// Re-export commonly used items at crate root
pub use crate::core::{Action, CallId, DelayCaller, Enqueuer, RelayError};
pub use backoff::BackoffScheduler;
pub use signaling::SignalingMessage;
pub use transport::{ConnectionState, Handlers, Payload, TransportClient};

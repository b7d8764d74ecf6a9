//! Signal Relay - Transport Layer
//!
//! This module implements the single-attempt control channel. It provides:
//!
//! - **Connection state machine**: [`ConnectionState`] with its legal transitions
//! - **Socket boundary**: [`Connector`], [`SocketHandle`], [`SocketEvent`]
//! - **Transport client**: [`TransportClient`], which turns socket events into
//!   callbacks delivered on the application's dispatch context
//! - **WebSocket connector**: [`WsConnector`] over tokio-tungstenite
//!   (requires `websocket` feature)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Peer connection (SDP / ICE)      │
//! ├─────────────────────────────────────────┤
//! │   SignalingChannel (reconnect policy)   │
//! ├─────────────────────────────────────────┤
//! │          Transport Layer                │  ← This module
//! │   state machine, callbacks, dispatch    │
//! ├─────────────────────────────────────────┤
//! │       WebSocket (tokio-tungstenite)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The transport never retries and never buffers: `send` while not connected
//! drops the message.

mod client;
mod connection;
mod error;
mod socket;
#[cfg(feature = "websocket")]
mod ws;

#[cfg(test)]
pub(crate) mod testing;

pub use client::*;
pub use connection::*;
pub use error::*;
pub use socket::*;
#[cfg(feature = "websocket")]
pub use ws::WsConnector;

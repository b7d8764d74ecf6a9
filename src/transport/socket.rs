//! Socket boundary.
//!
//! The transport client does not talk to a network library directly. It asks a
//! [`Connector`] to open a socket and gets back a [`SocketHandle`] for outbound
//! traffic; inbound outcomes arrive as [`SocketEvent`]s pushed into an
//! [`EventSink`] from whatever task or thread the socket lives on.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::DEFAULT_MAX_MESSAGE_SIZE;

/// Outbound message body.
///
/// Text goes out as a text frame, bytes as a binary frame. The transport never
/// looks inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Bytes),
}

impl Payload {
    /// Raw bytes of the payload.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(bytes) => bytes,
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert into raw bytes.
    pub fn into_bytes(self) -> Bytes {
        match self {
            Payload::Text(text) => Bytes::from(text),
            Payload::Binary(bytes) => bytes,
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_owned())
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Binary(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Binary(Bytes::copy_from_slice(bytes))
    }
}

/// Raw outcome reported by a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Socket open.
    Open,
    /// Frame received (text frames arrive as their UTF-8 bytes).
    Message(Bytes),
    /// Transport failure, with a diagnostic.
    Error(String),
    /// Orderly or peer-initiated close, with the close code.
    Close(u16),
}

/// Where a socket reports its events. Cheap to clone, callable from any thread.
#[derive(Clone)]
pub struct EventSink {
    inner: Arc<dyn Fn(SocketEvent) + Send + Sync>,
}

impl EventSink {
    /// Wrap a callback.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(SocketEvent) + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Report an event.
    pub fn emit(&self, event: SocketEvent) {
        (self.inner)(event)
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}

/// Outbound half of an open socket.
pub trait SocketHandle: Send {
    /// Queue a frame for sending. Must not block.
    fn send(&mut self, payload: Payload);

    /// Request an orderly close. Must not block.
    fn close(&mut self);
}

/// Opens sockets.
///
/// `open` returns immediately; the outcome (`Open` or `Error`, then messages and
/// a final `Close` or `Error`) is reported through `events`.
pub trait Connector: Send + Sync {
    /// Start opening a socket to `address`.
    fn open(
        &self,
        address: &str,
        options: &TransportOptions,
        events: EventSink,
    ) -> Box<dyn SocketHandle>;
}

/// Secure-transport protocol selection.
///
/// Some older signaling servers fail the handshake when TLS 1.3 is offered;
/// `Tls12Only` pins the version set for those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecureTransport {
    /// Negotiate TLS 1.2 or 1.3.
    #[default]
    Default,
    /// Offer TLS 1.2 only.
    Tls12Only,
}

/// Construction-time transport options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// TLS protocol selection for `wss://` addresses.
    pub secure_transport: SecureTransport,
    /// Largest inbound message accepted.
    pub max_message_size: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            secure_transport: SecureTransport::Default,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl TransportOptions {
    /// Set the TLS protocol selection.
    pub fn secure_transport(mut self, mode: SecureTransport) -> Self {
        self.secure_transport = mode;
        self
    }

    /// Set the inbound message size limit.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_conversions() {
        let text = Payload::from("ping");
        assert_eq!(text, Payload::Text("ping".into()));
        assert_eq!(text.as_bytes(), b"ping");
        assert_eq!(text.into_bytes(), Bytes::from_static(b"ping"));

        let binary = Payload::from(vec![1u8, 2, 3]);
        assert_eq!(binary.len(), 3);
        assert!(!binary.is_empty());
        assert!(matches!(binary, Payload::Binary(_)));
    }

    #[test]
    fn test_event_sink_forwards() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let sink = EventSink::new(move |event| log.lock().push(event));

        sink.clone().emit(SocketEvent::Open);
        sink.emit(SocketEvent::Close(1000));
        assert_eq!(*seen.lock(), vec![SocketEvent::Open, SocketEvent::Close(1000)]);
    }

    #[test]
    fn test_options_builder() {
        let options = TransportOptions::default()
            .secure_transport(SecureTransport::Tls12Only)
            .max_message_size(4096);

        assert_eq!(options.secure_transport, SecureTransport::Tls12Only);
        assert_eq!(options.max_message_size, 4096);
    }
}

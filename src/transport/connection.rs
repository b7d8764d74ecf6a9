//! Connection state machine for the transport client.
//!
//! ```text
//! NotConnected ──► Connecting ──► Connected
//!                      │              │
//!                      ├──────────────┼──► Closed
//!                      └──────────────┴──► Error
//! ```
//!
//! `Closed` and `Error` are terminal: a client that reached either is discarded
//! and a new one constructed for the next attempt.

use std::fmt;

/// Transport client lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Fresh client, `connect` not called yet.
    #[default]
    NotConnected,
    /// Socket open requested, outcome pending.
    Connecting,
    /// Socket open, messages flow.
    Connected,
    /// Closed locally or by the peer.
    Closed,
    /// Transport failure.
    Error,
}

impl ConnectionState {
    /// Whether no further transitions are defined.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Error)
    }

    /// Whether a socket is (or is about to be) live.
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }

    /// Check if moving to `next` is a legal event-driven transition.
    ///
    /// `close()` is the one exception: it forces `Closed` from any state.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (NotConnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Closed)
                | (Connecting, Error)
                | (Connected, Closed)
                | (Connected, Error)
        )
    }

    /// Short lowercase name, used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::NotConnected => "not_connected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
            ConnectionState::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

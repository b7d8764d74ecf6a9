//! Error types for Signal Relay.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors in channel configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Address is not a `ws://` or `wss://` URL.
    #[error("invalid signaling address {address:?}: {reason}")]
    InvalidAddress {
        /// The rejected address.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Minimum retry delay must be non-zero.
    #[error("minimum retry delay must be non-zero")]
    ZeroMinDelay,

    /// Maximum retry delay is below the minimum.
    #[error("maximum retry delay {max_ms}ms is below minimum {min_ms}ms")]
    DelayBounds {
        /// Configured minimum.
        min_ms: u64,
        /// Configured maximum.
        max_ms: u64,
    },
}

/// Errors when encoding or decoding a signaling message.
#[derive(Debug, Error)]
pub enum MessageError {
    /// Malformed JSON or missing fields.
    #[error("invalid signaling message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level Signal Relay errors.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Message error.
    #[error("message error: {0}")]
    Message(#[from] MessageError),
}

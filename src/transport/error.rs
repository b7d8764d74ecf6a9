//! Transport layer error types.
//!
//! Network failures are not errors here: they reach the application through
//! the `on_error` / `on_close` callbacks. What remains are caller mistakes.

use thiserror::Error;

use super::connection::ConnectionState;

/// Transport layer errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Operation called in a state that does not allow it.
    #[error("{operation} requires state {expected}, client is {actual}")]
    InvalidState {
        /// Rejected operation.
        operation: &'static str,
        /// State the operation requires.
        expected: ConnectionState,
        /// State the client was in.
        actual: ConnectionState,
    },
}

impl TransportError {
    /// Check if this error is a caller precondition violation.
    pub fn is_precondition(&self) -> bool {
        matches!(self, TransportError::InvalidState { .. })
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

//! Channel constants.
//!
//! Close codes follow RFC 6455 section 7.4.1.

use std::time::Duration;

// =============================================================================
// CLOSE CODES (RFC 6455)
// =============================================================================

/// Normal closure; the purpose of the connection was fulfilled.
pub const CLOSE_NORMAL: u16 = 1000;

/// Endpoint is going away (server shutdown, page navigation).
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Close frame carried no status code.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Connection dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

// =============================================================================
// BACKOFF
// =============================================================================

/// Default first retry delay.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(1000);

/// Ceiling factor applied to the minimum delay when no maximum is configured.
pub const MAX_DELAY_FACTOR: u32 = 10;

// =============================================================================
// CHANNEL
// =============================================================================

/// Default signaling server address.
pub const DEFAULT_ADDRESS: &str = "ws://127.0.0.1:80";

/// Default cap on a single inbound message (64 KiB is plenty for SDP).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 << 10;

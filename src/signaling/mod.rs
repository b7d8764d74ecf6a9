//! Signal Relay - Signaling messages
//!
//! The JSON schema spoken by the companion browser implementation. The
//! transport carries these as opaque text; this module only helps the layer
//! above build and read them.

mod message;

pub use message::*;

//! Signal Relay - Core traits, types, and constants.
//!
//! This module provides the host capabilities the rest of the crate is written
//! against, plus shared constants and error types. It has no I/O of its own.

mod constants;
mod error;
mod traits;

pub use constants::*;
pub use error::*;
pub use traits::*;

//! # Error Types
//!
//! Error handling for the relay, the wire codec and the capture tools.
//!
//! ## Error Categories
//! - **I/O Errors**: socket and capture file failures
//! - **Codec Errors**: truncated or malformed messages, short encode buffers
//! - **Capture Errors**: invalid JSON or hex in capture records
//! - **Configuration Errors**: unparsable addresses, invalid settings
//!
//! Codec errors are never fatal to the relay: the splitter and the handshake
//! interceptor turn them into unparsed results or pass-through forwarding.
//!
//! ## Example Usage
//! ```rust
//! use nox_relay::error::{RelayError, Result};
//! use tracing::error;
//!
//! fn parse_server(addr: &str) -> Result<std::net::SocketAddr> {
//!     addr.parse()
//!         .map_err(|_| RelayError::InvalidAddress(addr.to_string()))
//! }
//!
//! if let Err(e) = parse_server("not-an-address") {
//!     error!(error = %e, "Bad server address");
//! }
//! ```

use std::io;
use thiserror::Error;

use crate::protocol::op::Op;

/// Error message constants for the hot paths.
pub mod constants {
    pub const ERR_EMPTY_INPUT: &str = "No opcode to decode";
    pub const ERR_MISSING_TERMINATOR: &str = "String is not NUL-terminated";
    pub const ERR_INVALID_UTF8: &str = "String is not valid UTF-8";
    pub const ERR_FIELD_TOO_LONG: &str = "Field does not fit its wire width";
    pub const ERR_INTERIOR_NUL: &str = "String contains a NUL byte";
    pub const ERR_RELAY_CLOSED: &str = "Relay socket is closed";
    pub const ERR_CAPTURE_CLOSED: &str = "Capture sink is closed";
    pub const ERR_CAPTURE_POISONED: &str = "Capture writer lock is poisoned";
}

/// Primary error type for relay and codec operations
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("{0}")]
    EmptyInput(&'static str),

    #[error("Truncated {op}: need {need} bytes, have {have}")]
    Truncated { op: Op, need: usize, have: usize },

    #[error("Buffer too small for {op}: need {need} bytes, have {have}")]
    BufferTooSmall { op: Op, need: usize, have: usize },

    #[error("Invalid {field} in {op}: {reason}")]
    InvalidField {
        op: Op,
        field: &'static str,
        reason: &'static str,
    },

    #[error("Message is not a {0}")]
    UnexpectedMessage(Op),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Relay closed: {0}")]
    Closed(&'static str),

    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using RelayError
pub type Result<T> = std::result::Result<T, RelayError>;

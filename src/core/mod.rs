//! # Core Wire Components
//!
//! Datagram-level building blocks shared by the relay and the capture tools.
//!
//! ## Components
//! - **Header**: the 2-byte reliable/slot/sequence header
//! - **Obfuscation**: single-byte XOR applied after the handshake
//!
//! ## Wire Format
//! ```text
//! [R|slot(7)] [seq/ack(1)] [op(1)] [payload] [op(1)] [payload] ...
//! ```

pub mod header;
pub mod obfuscation;

pub use header::{DatagramHeader, HEADER_LEN, RELIABLE_FLAG, SLOT_MASK};
pub use obfuscation::{xor_in_place, ObfuscationKey};

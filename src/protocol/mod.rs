//! # Protocol Layer
//!
//! Message registry, codec, frame splitting and handshake interception.
//!
//! ## Components
//! - **Op**: one-byte message tags and their registry names
//! - **Message**: typed message shapes and the closed [`message::Message`] enum
//! - **Codec**: static opcode table, direction-aware decoding, encoding
//! - **Splitter**: cuts a frame payload into its back-to-back messages
//! - **Handshake**: rewrites connection-setup datagrams in flight
//!
//! Decoding never fails on unknown opcodes; it yields
//! [`message::MsgUnknown`] so unrecognized traffic survives inspection.

pub mod codec;
pub mod handshake;
pub mod message;
pub mod op;
pub mod splitter;

pub use codec::{append, DecodeState, PayloadLen};
pub use handshake::{Handshake, Interceptor};
pub use message::{Message, NetMessage};
pub use op::Op;
pub use splitter::{split, Split, SplitMessage};

#[cfg(test)]
mod tests;

//! Opcodes: the one-byte tag in front of every message.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::protocol::codec;

/// One-byte message tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Op(pub u8);

impl Op {
    /// Ping request from a client, ping reply from a server.
    pub const PING: Op = Op(0x0B);
    pub const SERVER_DISCOVER: Op = Op(0x0C);
    pub const SERVER_INFO: Op = Op(0x0D);
    pub const KEEP_ALIVE: Op = Op(0x0F);
    pub const SERVER_ACCEPT: Op = Op(0x14);
    pub const ACCEPTED: Op = Op(0x20);
    pub const FULL_TIMESTAMP: Op = Op(0x27);
    pub const TIMESTAMP: Op = Op(0x28);
    pub const TEXT_MESSAGE: Op = Op(0xA8);

    #[inline]
    pub fn byte(self) -> u8 {
        self.0
    }

    /// Whether the opcode has an entry in the message registry.
    pub fn is_registered(self) -> bool {
        codec::descriptor(self).is_some()
    }

    /// Fixed payload length (without the opcode byte), or `None` when the
    /// length depends on content or the opcode is not registered.
    pub fn payload_len(self) -> Option<usize> {
        codec::descriptor(self).and_then(|d| d.len.fixed())
    }

    /// Registry name, if the opcode is registered.
    pub fn name(self) -> Option<&'static str> {
        codec::descriptor(self).map(|d| d.name)
    }
}

impl From<u8> for Op {
    fn from(b: u8) -> Self {
        Op(b)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "OP_0x{:02X}", self.0),
        }
    }
}

impl Serialize for Op {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_names() {
        assert_eq!(Op::SERVER_ACCEPT.to_string(), "MSG_SERVER_ACCEPT");
        assert_eq!(Op::SERVER_INFO.name(), Some("MSG_SERVER_INFO"));
    }

    #[test]
    fn test_unregistered_display() {
        let op = Op(0xFF);
        assert!(!op.is_registered());
        assert_eq!(op.payload_len(), None);
        assert_eq!(op.to_string(), "OP_0xFF");
    }

    #[test]
    fn test_payload_lengths() {
        assert_eq!(Op::SERVER_ACCEPT.payload_len(), Some(5));
        assert_eq!(Op::KEEP_ALIVE.payload_len(), Some(0));
        assert_eq!(Op::SERVER_INFO.payload_len(), None);
        assert_eq!(Op::PING.payload_len(), None);
    }
}

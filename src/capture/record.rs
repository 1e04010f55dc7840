//! Capture record formats (JSON lines).
//!
//! `src_id`/`dst_id` identify the relay's client ports; `0` is the server
//! side. A record with a nonzero `src_id` was sent by a client.

use serde::{Deserialize, Serialize};

use crate::protocol::message::Message;

/// One captured datagram, as written by the relay and read by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub src_id: u32,
    pub dst_id: u32,
    pub src: String,
    pub dst: String,
    /// Hex-encoded raw datagram
    pub data: String,
}

impl CaptureRecord {
    pub fn new(src_id: u32, dst_id: u32, src: String, dst: String, datagram: &[u8]) -> Self {
        Self {
            src_id,
            dst_id,
            src,
            dst,
            data: hex::encode(datagram),
        }
    }

    /// The datagram was sent by a client rather than the server.
    pub fn is_client(&self) -> bool {
        self.src_id != 0
    }
}

/// Decoded form of a [`CaptureRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodedRecord {
    pub src_id: u32,
    pub dst_id: u32,
    pub src: String,
    pub dst: String,
    /// Hex of the two header bytes; empty for datagrams shorter than a header
    pub hdr: String,
    pub sid: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub syn: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack: Option<u8>,
    pub len: usize,
    /// Opcode name of a bare single-byte payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ops: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub msgs: Vec<DecodedMessage>,
    /// Raw hex, kept only when the datagram was not fully attributed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// One message inside a [`DecodedRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedMessage {
    pub op: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Message>,
    pub len: usize,
    pub data: String,
}

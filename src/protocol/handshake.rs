//! Handshake interception on the server-to-client path.
//!
//! Three connection-setup datagrams are recognized by their header bytes and
//! the opcode at index 2:
//!
//! | header  | opcode(s)                          | action                         |
//! |---------|------------------------------------|--------------------------------|
//! | `00 00` | `MSG_SERVER_INFO`                  | prefix the server name         |
//! | `80 00` | `MSG_SERVER_ACCEPT`                | capture and zero the XOR key   |
//! | `80 00` | `MSG_ACCEPTED` + `MSG_SERVER_ACCEPT` | same, on the second message  |
//!
//! The key is stored on the client port and zeroed before forwarding, so the
//! real client talks in clear to the relay while the relay keeps talking
//! obfuscated to the real server.
//!
//! Any decode or encode failure returns the original datagram untouched.

use std::borrow::Cow;

use tracing::{debug, warn};

use crate::core::header::{HEADER_LEN, RELIABLE_FLAG};
use crate::core::obfuscation::ObfuscationKey;
use crate::error::{RelayError, Result};
use crate::protocol::codec::append;
use crate::protocol::message::{MsgAccepted, MsgServerAccept, MsgServerInfo, NetMessage};
use crate::protocol::op::Op;

/// Offset of the first opcode in a datagram.
const OP_OFFSET: usize = HEADER_LEN;

/// Default prefix added to announced server names.
pub const DEFAULT_NAME_PREFIX: &str = "Proxy: ";

/// Handshake datagram kinds the interceptor rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handshake {
    ServerInfo,
    ServerAccept,
    AcceptedThenServerAccept,
}

impl Handshake {
    /// Classify a datagram by its header bytes and first opcode.
    pub fn classify(data: &[u8]) -> Option<Self> {
        if data.len() <= OP_OFFSET {
            return None;
        }
        match (data[0], data[1], Op(data[OP_OFFSET])) {
            (0, 0, Op::SERVER_INFO) => Some(Handshake::ServerInfo),
            (RELIABLE_FLAG, 0, Op::SERVER_ACCEPT) => Some(Handshake::ServerAccept),
            (RELIABLE_FLAG, 0, Op::ACCEPTED) => Some(Handshake::AcceptedThenServerAccept),
            _ => None,
        }
    }
}

/// Decode the message of type `T` at the front of `data`, let `mutate`
/// change it, and re-encode it in place of the original bytes.
///
/// `data[..OP_OFFSET + 1]` (header and opcode) is copied as-is, and bytes
/// after the decoded message are kept.
pub fn rewrite<T, F>(data: &[u8], mutate: F) -> Result<Vec<u8>>
where
    T: NetMessage,
    F: FnOnce(&mut T),
{
    let body = OP_OFFSET + 1;
    let (mut msg, used) = T::decode_payload(&data[body..])?;
    mutate(&mut msg);

    let size = msg.payload_size();
    let tail = &data[body + used..];
    let mut out = vec![0u8; body + size + tail.len()];
    out[..body].copy_from_slice(&data[..body]);
    let n = msg.encode_payload(&mut out[body..body + size])?;
    out[body + n..].copy_from_slice(tail);
    Ok(out)
}

/// Server-to-client handshake rewriter.
#[derive(Debug, Clone)]
pub struct Interceptor {
    name_prefix: String,
}

impl Default for Interceptor {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_PREFIX)
    }
}

impl Interceptor {
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
        }
    }

    /// Rewrite a (decrypted) server datagram if it is a handshake message.
    ///
    /// Returns the input borrowed when nothing was changed or when the
    /// rewrite failed.
    pub fn intercept_server<'a>(&self, key: &ObfuscationKey, data: &'a [u8]) -> Cow<'a, [u8]> {
        let Some(kind) = Handshake::classify(data) else {
            return Cow::Borrowed(data);
        };
        let result = match kind {
            Handshake::ServerInfo => rewrite(data, |info: &mut MsgServerInfo| {
                info.server_name.insert_str(0, &self.name_prefix);
            }),
            Handshake::ServerAccept => rewrite(data, |accept: &mut MsgServerAccept| {
                take_key(key, accept);
            }),
            Handshake::AcceptedThenServerAccept => rewrite_accepted(key, data),
        };
        match result {
            Ok(out) => {
                debug!(?kind, key = key.get(), "Rewrote handshake datagram");
                Cow::Owned(out)
            }
            Err(e) => {
                warn!(?kind, error = %e, "Handshake rewrite failed, forwarding unmodified");
                Cow::Borrowed(data)
            }
        }
    }
}

fn take_key(key: &ObfuscationKey, accept: &mut MsgServerAccept) {
    key.set(accept.xor_key);
    accept.xor_key = 0;
}

fn rewrite_accepted(key: &ObfuscationKey, data: &[u8]) -> Result<Vec<u8>> {
    let body = &data[OP_OFFSET + 1..];
    let (accepted, n) = MsgAccepted::decode_payload(body)?;

    let left = &body[n..];
    match left.first() {
        Some(&op) if Op(op) == Op::SERVER_ACCEPT => {}
        _ => return Err(RelayError::UnexpectedMessage(Op::SERVER_ACCEPT)),
    }
    let (mut accept, m) = MsgServerAccept::decode_payload(&left[1..])?;
    let tail = &left[1 + m..];

    // The port key changes only once both messages re-encode.
    let stored = accept.xor_key;
    accept.xor_key = 0;
    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&data[..OP_OFFSET]);
    append(&mut out, &accepted.into())?;
    append(&mut out, &accept.into())?;
    out.extend_from_slice(tail);

    key.set(stored);
    Ok(out)
}

//! # Message Registry & Codec
//!
//! Opcode dispatch is a static 256-entry table indexed by the opcode byte.
//! Each entry describes the payload length and carries the decode/encode
//! function pair for that shape. Opcodes without an entry decode to
//! [`Message::Unknown`] holding the rest of the buffer, so unrecognized
//! traffic never fails to decode.
//!
//! Some opcodes mean different things depending on who sent them; the caller
//! sets [`DecodeState::is_client`] before decoding.

use crate::error::{constants, RelayError, Result};
use crate::protocol::message::*;
use crate::protocol::op::Op;

/// Payload length of an opcode, as declared by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLen {
    Fixed(usize),
    /// Depends on content (or on sender direction): decode to find out.
    Variable,
}

impl PayloadLen {
    pub fn fixed(self) -> Option<usize> {
        match self {
            PayloadLen::Fixed(n) => Some(n),
            PayloadLen::Variable => None,
        }
    }
}

type DecodeFn = fn(&DecodeState, &[u8]) -> Result<(Message, usize)>;
type EncodeFn = fn(&Message, &mut [u8]) -> Result<usize>;

/// Registry entry for one opcode.
#[derive(Clone, Copy)]
pub struct OpDescriptor {
    pub op: Op,
    pub name: &'static str,
    pub len: PayloadLen,
    decode: DecodeFn,
    encode: EncodeFn,
}

impl std::fmt::Debug for OpDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpDescriptor")
            .field("op", &self.op)
            .field("name", &self.name)
            .field("len", &self.len)
            .finish()
    }
}

fn decode_as<T: NetMessage>(_: &DecodeState, payload: &[u8]) -> Result<(Message, usize)> {
    let (msg, n) = T::decode_payload(payload)?;
    Ok((msg.into(), n))
}

fn encode_as<T: NetMessage>(msg: &Message, buf: &mut [u8]) -> Result<usize> {
    T::from_message(msg)
        .ok_or(RelayError::UnexpectedMessage(T::OP))?
        .encode_payload(buf)
}

fn decode_ping(state: &DecodeState, payload: &[u8]) -> Result<(Message, usize)> {
    if state.is_client {
        decode_as::<MsgPing>(state, payload)
    } else {
        decode_as::<MsgPong>(state, payload)
    }
}

fn encode_ping(msg: &Message, buf: &mut [u8]) -> Result<usize> {
    match msg {
        Message::Ping(m) => m.encode_payload(buf),
        Message::Pong(m) => m.encode_payload(buf),
        _ => Err(RelayError::UnexpectedMessage(Op::PING)),
    }
}

const fn entry<T: NetMessage>(name: &'static str, len: PayloadLen) -> OpDescriptor {
    OpDescriptor {
        op: T::OP,
        name,
        len,
        decode: decode_as::<T>,
        encode: encode_as::<T>,
    }
}

const DESCRIPTORS: [OpDescriptor; 9] = [
    OpDescriptor {
        op: Op::PING,
        name: "MSG_PING",
        len: PayloadLen::Variable,
        decode: decode_ping,
        encode: encode_ping,
    },
    entry::<MsgServerDiscover>("MSG_SERVER_DISCOVER", PayloadLen::Fixed(8)),
    entry::<MsgServerInfo>("MSG_SERVER_INFO", PayloadLen::Variable),
    entry::<MsgKeepAlive>("MSG_KEEP_ALIVE", PayloadLen::Fixed(0)),
    entry::<MsgServerAccept>("MSG_SERVER_ACCEPT", PayloadLen::Fixed(5)),
    entry::<MsgAccepted>("MSG_ACCEPTED", PayloadLen::Fixed(4)),
    entry::<MsgFullTimestamp>("MSG_FULL_TIMESTAMP", PayloadLen::Fixed(4)),
    entry::<MsgTimestamp>("MSG_TIMESTAMP", PayloadLen::Fixed(2)),
    entry::<MsgTextMessage>("MSG_TEXT_MESSAGE", PayloadLen::Variable),
];

const fn build_table() -> [Option<OpDescriptor>; 256] {
    let mut table: [Option<OpDescriptor>; 256] = [None; 256];
    let mut i = 0;
    while i < DESCRIPTORS.len() {
        table[DESCRIPTORS[i].op.0 as usize] = Some(DESCRIPTORS[i]);
        i += 1;
    }
    table
}

static TABLE: [Option<OpDescriptor>; 256] = build_table();

/// Registry lookup.
#[inline]
pub fn descriptor(op: Op) -> Option<&'static OpDescriptor> {
    TABLE[op.0 as usize].as_ref()
}

/// All registered opcodes, in registry order.
pub fn registered() -> impl Iterator<Item = &'static OpDescriptor> {
    DESCRIPTORS.iter()
}

/// Decode context threaded through a stream of decode calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeState {
    /// The stream being decoded was sent by a client.
    pub is_client: bool,
}

impl DecodeState {
    pub fn new(is_client: bool) -> Self {
        Self { is_client }
    }

    /// Decode the message at the front of `data` (starting with its opcode).
    ///
    /// The returned count includes the opcode byte. Unregistered opcodes
    /// consume the rest of the buffer as [`MsgUnknown`].
    pub fn decode_next(&self, data: &[u8]) -> Result<(Message, usize)> {
        let (&op, payload) = data
            .split_first()
            .ok_or(RelayError::EmptyInput(constants::ERR_EMPTY_INPUT))?;
        let op = Op(op);
        match descriptor(op) {
            Some(desc) => {
                let (msg, n) = (desc.decode)(self, payload)?;
                Ok((msg, n + 1))
            }
            None => Ok((
                Message::Unknown(MsgUnknown {
                    op,
                    data: payload.to_vec(),
                }),
                data.len(),
            )),
        }
    }
}

impl Message {
    /// Write opcode and payload into `buf`, returning the bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        let op = self.op();
        let need = self.encoded_size();
        if buf.len() < need {
            return Err(RelayError::BufferTooSmall {
                op,
                need,
                have: buf.len(),
            });
        }
        buf[0] = op.0;
        let n = match (self, descriptor(op)) {
            (Message::Unknown(m), _) => {
                buf[1..need].copy_from_slice(&m.data);
                m.data.len()
            }
            (_, Some(desc)) => (desc.encode)(self, &mut buf[1..])?,
            (_, None) => return Err(RelayError::UnexpectedMessage(op)),
        };
        Ok(n + 1)
    }

    /// Encode into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        append(&mut buf, self)?;
        Ok(buf)
    }
}

/// Append the encoded form of `msg` to `out`.
///
/// On failure `out` is left as it was.
pub fn append(out: &mut Vec<u8>, msg: &Message) -> Result<()> {
    let start = out.len();
    out.resize(start + msg.encoded_size(), 0);
    match msg.encode(&mut out[start..]) {
        Ok(n) => {
            out.truncate(start + n);
            Ok(())
        }
        Err(e) => {
            out.truncate(start);
            Err(e)
        }
    }
}

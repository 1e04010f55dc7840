//! Typed protocol messages.
//!
//! Every message is a plain struct implementing [`NetMessage`]; the closed set
//! of known shapes is collected in the [`Message`] enum. Integers are
//! little-endian. Payload encoders assume the opcode byte has already been
//! written by the caller.

use bytes::{Buf, BufMut};
use serde::{Serialize, Serializer};

use crate::error::{constants, RelayError, Result};
use crate::protocol::op::Op;

/// Width of the NUL-padded map name in `MSG_SERVER_INFO`.
pub const MAP_NAME_LEN: usize = 9;

/// Largest text a `MSG_TEXT_MESSAGE` can carry (single size byte).
pub const MAX_TEXT_LEN: usize = u8::MAX as usize;

/// Fixed-width map name field of `MSG_SERVER_INFO`.
///
/// Kept as the raw wire bytes: a name may fill all nine bytes without a
/// terminator, and whatever follows the first NUL is preserved on re-encode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MapName(pub [u8; MAP_NAME_LEN]);

impl MapName {
    /// NUL-padded field holding `name`.
    pub fn new(name: &str) -> Result<Self> {
        check_no_nul(Op::SERVER_INFO, "map_name", name)?;
        if name.len() > MAP_NAME_LEN {
            return Err(RelayError::InvalidField {
                op: Op::SERVER_INFO,
                field: "map_name",
                reason: constants::ERR_FIELD_TOO_LONG,
            });
        }
        let mut raw = [0u8; MAP_NAME_LEN];
        raw[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; MAP_NAME_LEN] {
        &self.0
    }

    /// Bytes before the first NUL.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(MAP_NAME_LEN);
        &self.0[..end]
    }

    /// Name as text, invalid UTF-8 replaced.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }
}

impl PartialEq<str> for MapName {
    fn eq(&self, other: &str) -> bool {
        self.name_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for MapName {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl Serialize for MapName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_text())
    }
}

/// A message shape with a fixed opcode and its own payload codec.
pub trait NetMessage: Sized + Into<Message> {
    const OP: Op;

    /// Encoded payload size, without the opcode byte.
    fn payload_size(&self) -> usize;

    /// Write the payload into `buf`, returning the bytes written.
    fn encode_payload(&self, buf: &mut [u8]) -> Result<usize>;

    /// Decode a payload (opcode byte already stripped), returning the
    /// message and the payload bytes consumed.
    fn decode_payload(data: &[u8]) -> Result<(Self, usize)>;

    /// Borrow `msg` as this type, if it is one.
    fn from_message(msg: &Message) -> Option<&Self>;
}

#[inline]
fn ensure_input(op: Op, data: &[u8], need: usize) -> Result<()> {
    if data.len() < need {
        return Err(RelayError::Truncated {
            op,
            need,
            have: data.len(),
        });
    }
    Ok(())
}

#[inline]
fn ensure_output(op: Op, buf: &[u8], need: usize) -> Result<()> {
    if buf.len() < need {
        return Err(RelayError::BufferTooSmall {
            op,
            need,
            have: buf.len(),
        });
    }
    Ok(())
}

fn utf8(op: Op, field: &'static str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| RelayError::InvalidField {
        op,
        field,
        reason: constants::ERR_INVALID_UTF8,
    })
}

/// Read a NUL-terminated string; the count includes the terminator.
fn read_cstr(op: Op, field: &'static str, data: &[u8]) -> Result<(String, usize)> {
    let end = data
        .iter()
        .position(|&b| b == 0)
        .ok_or(RelayError::InvalidField {
            op,
            field,
            reason: constants::ERR_MISSING_TERMINATOR,
        })?;
    Ok((utf8(op, field, &data[..end])?, end + 1))
}

fn check_no_nul(op: Op, field: &'static str, s: &str) -> Result<()> {
    if s.as_bytes().contains(&0) {
        return Err(RelayError::InvalidField {
            op,
            field,
            reason: constants::ERR_INTERIOR_NUL,
        });
    }
    Ok(())
}

fn serialize_hex<S: Serializer>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(data))
}

/// Client ping request (`MSG_PING` sent by a client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgPing {
    pub token: u32,
}

impl NetMessage for MsgPing {
    const OP: Op = Op::PING;

    fn payload_size(&self) -> usize {
        4
    }

    fn encode_payload(&self, buf: &mut [u8]) -> Result<usize> {
        ensure_output(Self::OP, buf, 4)?;
        let mut out = &mut buf[..];
        out.put_u32_le(self.token);
        Ok(4)
    }

    fn decode_payload(data: &[u8]) -> Result<(Self, usize)> {
        ensure_input(Self::OP, data, 4)?;
        let mut buf = data;
        Ok((
            Self {
                token: buf.get_u32_le(),
            },
            4,
        ))
    }

    fn from_message(msg: &Message) -> Option<&Self> {
        match msg {
            Message::Ping(m) => Some(m),
            _ => None,
        }
    }
}

/// Server ping reply (`MSG_PING` sent by a server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgPong {
    pub token: u32,
    pub players: u8,
}

impl NetMessage for MsgPong {
    const OP: Op = Op::PING;

    fn payload_size(&self) -> usize {
        5
    }

    fn encode_payload(&self, buf: &mut [u8]) -> Result<usize> {
        ensure_output(Self::OP, buf, 5)?;
        let mut out = &mut buf[..];
        out.put_u32_le(self.token);
        out.put_u8(self.players);
        Ok(5)
    }

    fn decode_payload(data: &[u8]) -> Result<(Self, usize)> {
        ensure_input(Self::OP, data, 5)?;
        let mut buf = data;
        let token = buf.get_u32_le();
        let players = buf.get_u8();
        Ok((Self { token, players }, 5))
    }

    fn from_message(msg: &Message) -> Option<&Self> {
        match msg {
            Message::Pong(m) => Some(m),
            _ => None,
        }
    }
}

/// LAN discovery probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgServerDiscover {
    pub token: u32,
    pub version: u32,
}

impl NetMessage for MsgServerDiscover {
    const OP: Op = Op::SERVER_DISCOVER;

    fn payload_size(&self) -> usize {
        8
    }

    fn encode_payload(&self, buf: &mut [u8]) -> Result<usize> {
        ensure_output(Self::OP, buf, 8)?;
        let mut out = &mut buf[..];
        out.put_u32_le(self.token);
        out.put_u32_le(self.version);
        Ok(8)
    }

    fn decode_payload(data: &[u8]) -> Result<(Self, usize)> {
        ensure_input(Self::OP, data, 8)?;
        let mut buf = data;
        let token = buf.get_u32_le();
        let version = buf.get_u32_le();
        Ok((Self { token, version }, 8))
    }

    fn from_message(msg: &Message) -> Option<&Self> {
        match msg {
            Message::ServerDiscover(m) => Some(m),
            _ => None,
        }
    }
}

/// Server announcement answering a discovery probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgServerInfo {
    pub players: u8,
    pub max_players: u8,
    pub flags: u16,
    pub timestamp: u32,
    pub map_name: MapName,
    pub server_name: String,
}

impl MsgServerInfo {
    const FIXED_LEN: usize = 1 + 1 + 2 + 4 + MAP_NAME_LEN;
}

impl NetMessage for MsgServerInfo {
    const OP: Op = Op::SERVER_INFO;

    fn payload_size(&self) -> usize {
        Self::FIXED_LEN + self.server_name.len() + 1
    }

    fn encode_payload(&self, buf: &mut [u8]) -> Result<usize> {
        let size = self.payload_size();
        ensure_output(Self::OP, buf, size)?;
        check_no_nul(Self::OP, "server_name", &self.server_name)?;

        let (fixed, rest) = buf.split_at_mut(Self::FIXED_LEN);
        let (head, map) = fixed.split_at_mut(Self::FIXED_LEN - MAP_NAME_LEN);
        let mut out = head;
        out.put_u8(self.players);
        out.put_u8(self.max_players);
        out.put_u16_le(self.flags);
        out.put_u32_le(self.timestamp);
        map.copy_from_slice(self.map_name.as_bytes());

        let name = self.server_name.as_bytes();
        rest[..name.len()].copy_from_slice(name);
        rest[name.len()] = 0;
        Ok(size)
    }

    fn decode_payload(data: &[u8]) -> Result<(Self, usize)> {
        ensure_input(Self::OP, data, Self::FIXED_LEN + 1)?;
        let mut buf = data;
        let players = buf.get_u8();
        let max_players = buf.get_u8();
        let flags = buf.get_u16_le();
        let timestamp = buf.get_u32_le();
        let mut map_name = MapName::default();
        map_name.0.copy_from_slice(&buf[..MAP_NAME_LEN]);
        let (server_name, n) = read_cstr(Self::OP, "server_name", &buf[MAP_NAME_LEN..])?;
        Ok((
            Self {
                players,
                max_players,
                flags,
                timestamp,
                map_name,
                server_name,
            },
            Self::FIXED_LEN + n,
        ))
    }

    fn from_message(msg: &Message) -> Option<&Self> {
        match msg {
            Message::ServerInfo(m) => Some(m),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MsgKeepAlive {}

impl NetMessage for MsgKeepAlive {
    const OP: Op = Op::KEEP_ALIVE;

    fn payload_size(&self) -> usize {
        0
    }

    fn encode_payload(&self, _buf: &mut [u8]) -> Result<usize> {
        Ok(0)
    }

    fn decode_payload(_data: &[u8]) -> Result<(Self, usize)> {
        Ok((Self {}, 0))
    }

    fn from_message(msg: &Message) -> Option<&Self> {
        match msg {
            Message::KeepAlive(m) => Some(m),
            _ => None,
        }
    }
}

/// Server accepting a join request; carries the session obfuscation key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgServerAccept {
    pub id: u32,
    pub xor_key: u8,
}

impl NetMessage for MsgServerAccept {
    const OP: Op = Op::SERVER_ACCEPT;

    fn payload_size(&self) -> usize {
        5
    }

    fn encode_payload(&self, buf: &mut [u8]) -> Result<usize> {
        ensure_output(Self::OP, buf, 5)?;
        let mut out = &mut buf[..];
        out.put_u32_le(self.id);
        out.put_u8(self.xor_key);
        Ok(5)
    }

    fn decode_payload(data: &[u8]) -> Result<(Self, usize)> {
        ensure_input(Self::OP, data, 5)?;
        let mut buf = data;
        let id = buf.get_u32_le();
        let xor_key = buf.get_u8();
        Ok((Self { id, xor_key }, 5))
    }

    fn from_message(msg: &Message) -> Option<&Self> {
        match msg {
            Message::ServerAccept(m) => Some(m),
            _ => None,
        }
    }
}

/// Join confirmation; usually followed by a server-accept in the same datagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgAccepted {
    pub id: u32,
}

impl NetMessage for MsgAccepted {
    const OP: Op = Op::ACCEPTED;

    fn payload_size(&self) -> usize {
        4
    }

    fn encode_payload(&self, buf: &mut [u8]) -> Result<usize> {
        ensure_output(Self::OP, buf, 4)?;
        let mut out = &mut buf[..];
        out.put_u32_le(self.id);
        Ok(4)
    }

    fn decode_payload(data: &[u8]) -> Result<(Self, usize)> {
        ensure_input(Self::OP, data, 4)?;
        let mut buf = data;
        Ok((Self { id: buf.get_u32_le() }, 4))
    }

    fn from_message(msg: &Message) -> Option<&Self> {
        match msg {
            Message::Accepted(m) => Some(m),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgFullTimestamp {
    pub timestamp: u32,
}

impl NetMessage for MsgFullTimestamp {
    const OP: Op = Op::FULL_TIMESTAMP;

    fn payload_size(&self) -> usize {
        4
    }

    fn encode_payload(&self, buf: &mut [u8]) -> Result<usize> {
        ensure_output(Self::OP, buf, 4)?;
        let mut out = &mut buf[..];
        out.put_u32_le(self.timestamp);
        Ok(4)
    }

    fn decode_payload(data: &[u8]) -> Result<(Self, usize)> {
        ensure_input(Self::OP, data, 4)?;
        let mut buf = data;
        Ok((
            Self {
                timestamp: buf.get_u32_le(),
            },
            4,
        ))
    }

    fn from_message(msg: &Message) -> Option<&Self> {
        match msg {
            Message::FullTimestamp(m) => Some(m),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgTimestamp {
    pub timestamp: u16,
}

impl NetMessage for MsgTimestamp {
    const OP: Op = Op::TIMESTAMP;

    fn payload_size(&self) -> usize {
        2
    }

    fn encode_payload(&self, buf: &mut [u8]) -> Result<usize> {
        ensure_output(Self::OP, buf, 2)?;
        let mut out = &mut buf[..];
        out.put_u16_le(self.timestamp);
        Ok(2)
    }

    fn decode_payload(data: &[u8]) -> Result<(Self, usize)> {
        ensure_input(Self::OP, data, 2)?;
        let mut buf = data;
        Ok((
            Self {
                timestamp: buf.get_u16_le(),
            },
            2,
        ))
    }

    fn from_message(msg: &Message) -> Option<&Self> {
        match msg {
            Message::Timestamp(m) => Some(m),
            _ => None,
        }
    }
}

/// Chat line; the text length is carried in a single size byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgTextMessage {
    pub sender: u16,
    pub flags: u8,
    pub text: String,
}

impl NetMessage for MsgTextMessage {
    const OP: Op = Op::TEXT_MESSAGE;

    fn payload_size(&self) -> usize {
        4 + self.text.len()
    }

    fn encode_payload(&self, buf: &mut [u8]) -> Result<usize> {
        if self.text.len() > MAX_TEXT_LEN {
            return Err(RelayError::InvalidField {
                op: Self::OP,
                field: "text",
                reason: constants::ERR_FIELD_TOO_LONG,
            });
        }
        let size = self.payload_size();
        ensure_output(Self::OP, buf, size)?;
        let mut out = &mut buf[..];
        out.put_u16_le(self.sender);
        out.put_u8(self.flags);
        out.put_u8(self.text.len() as u8);
        out.put_slice(self.text.as_bytes());
        Ok(size)
    }

    fn decode_payload(data: &[u8]) -> Result<(Self, usize)> {
        ensure_input(Self::OP, data, 4)?;
        let mut buf = data;
        let sender = buf.get_u16_le();
        let flags = buf.get_u8();
        let size = buf.get_u8() as usize;
        ensure_input(Self::OP, data, 4 + size)?;
        let text = utf8(Self::OP, "text", &buf[..size])?;
        Ok((
            Self {
                sender,
                flags,
                text,
            },
            4 + size,
        ))
    }

    fn from_message(msg: &Message) -> Option<&Self> {
        match msg {
            Message::TextMessage(m) => Some(m),
            _ => None,
        }
    }
}

/// Opcode outside the registry; keeps the raw payload for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgUnknown {
    pub op: Op,
    #[serde(serialize_with = "serialize_hex")]
    pub data: Vec<u8>,
}

/// Closed set of decodable messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Ping(MsgPing),
    Pong(MsgPong),
    ServerDiscover(MsgServerDiscover),
    ServerInfo(MsgServerInfo),
    KeepAlive(MsgKeepAlive),
    ServerAccept(MsgServerAccept),
    Accepted(MsgAccepted),
    FullTimestamp(MsgFullTimestamp),
    Timestamp(MsgTimestamp),
    TextMessage(MsgTextMessage),
    Unknown(MsgUnknown),
}

macro_rules! message_from {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Message {
                fn from(m: $ty) -> Self {
                    Message::$variant(m)
                }
            }
        )*
    };
}

message_from! {
    MsgPing => Ping,
    MsgPong => Pong,
    MsgServerDiscover => ServerDiscover,
    MsgServerInfo => ServerInfo,
    MsgKeepAlive => KeepAlive,
    MsgServerAccept => ServerAccept,
    MsgAccepted => Accepted,
    MsgFullTimestamp => FullTimestamp,
    MsgTimestamp => Timestamp,
    MsgTextMessage => TextMessage,
    MsgUnknown => Unknown,
}

impl Message {
    pub fn op(&self) -> Op {
        match self {
            Message::Ping(_) => MsgPing::OP,
            Message::Pong(_) => MsgPong::OP,
            Message::ServerDiscover(_) => MsgServerDiscover::OP,
            Message::ServerInfo(_) => MsgServerInfo::OP,
            Message::KeepAlive(_) => MsgKeepAlive::OP,
            Message::ServerAccept(_) => MsgServerAccept::OP,
            Message::Accepted(_) => MsgAccepted::OP,
            Message::FullTimestamp(_) => MsgFullTimestamp::OP,
            Message::Timestamp(_) => MsgTimestamp::OP,
            Message::TextMessage(_) => MsgTextMessage::OP,
            Message::Unknown(m) => m.op,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Message::Unknown(_))
    }

    /// Encoded payload size, without the opcode byte.
    pub fn payload_size(&self) -> usize {
        match self {
            Message::Ping(m) => m.payload_size(),
            Message::Pong(m) => m.payload_size(),
            Message::ServerDiscover(m) => m.payload_size(),
            Message::ServerInfo(m) => m.payload_size(),
            Message::KeepAlive(m) => m.payload_size(),
            Message::ServerAccept(m) => m.payload_size(),
            Message::Accepted(m) => m.payload_size(),
            Message::FullTimestamp(m) => m.payload_size(),
            Message::Timestamp(m) => m.payload_size(),
            Message::TextMessage(m) => m.payload_size(),
            Message::Unknown(m) => m.data.len(),
        }
    }

    /// Full encoded size including the opcode byte.
    pub fn encoded_size(&self) -> usize {
        1 + self.payload_size()
    }
}

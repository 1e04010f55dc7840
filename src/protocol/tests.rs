// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::borrow::Cow;

use crate::core::obfuscation::ObfuscationKey;
use crate::protocol::codec::DecodeState;
use crate::protocol::handshake::Interceptor;
use crate::protocol::message::*;
use crate::protocol::op::Op;
use crate::protocol::splitter::split;

fn datagram(header: [u8; 2], msgs: &[Message]) -> Vec<u8> {
    let mut out = header.to_vec();
    for m in msgs {
        crate::protocol::codec::append(&mut out, m).expect("encode");
    }
    out
}

fn server_info(name: &str) -> MsgServerInfo {
    MsgServerInfo {
        players: 2,
        max_players: 32,
        flags: 0x10,
        timestamp: 123_456,
        map_name: MapName::new("manamine").unwrap(),
        server_name: name.into(),
    }
}

#[test]
fn test_server_accept_key_captured_and_zeroed() {
    let key = ObfuscationKey::new();
    let data = datagram([0x80, 0x00], &[MsgServerAccept { id: 42, xor_key: 0x37 }.into()]);

    let out = Interceptor::default().intercept_server(&key, &data);

    assert_eq!(key.get(), 0x37);
    let (msg, n) = DecodeState::default().decode_next(&out[2..]).expect("decode");
    assert_eq!(n, out.len() - 2);
    assert_eq!(msg, Message::ServerAccept(MsgServerAccept { id: 42, xor_key: 0 }));
}

#[test]
fn test_malformed_server_accept_passes_through() {
    let key = ObfuscationKey::new();
    // Opcode present, payload two bytes short.
    let data = vec![0x80, 0x00, Op::SERVER_ACCEPT.0, 1, 0, 0];

    let out = Interceptor::default().intercept_server(&key, &data);

    assert!(matches!(out, Cow::Borrowed(_)));
    assert_eq!(&*out, data.as_slice());
    assert!(!key.is_set());
}

#[test]
fn test_accepted_then_server_accept() {
    let key = ObfuscationKey::new();
    let data = datagram(
        [0x80, 0x00],
        &[
            MsgAccepted { id: 5 }.into(),
            MsgServerAccept { id: 5, xor_key: 0x9C }.into(),
        ],
    );

    let out = Interceptor::default().intercept_server(&key, &data);

    assert_eq!(key.get(), 0x9C);
    assert_eq!(&out[..2], &[0x80, 0x00]);
    let parts = split(&out[2..], &DecodeState::default());
    assert!(parts.fully_split);
    let msgs: Vec<_> = parts.messages.into_iter().filter_map(|m| m.message).collect();
    assert_eq!(
        msgs,
        vec![
            Message::Accepted(MsgAccepted { id: 5 }),
            Message::ServerAccept(MsgServerAccept { id: 5, xor_key: 0 }),
        ]
    );
}

#[test]
fn test_accepted_with_broken_server_accept_passes_through() {
    let key = ObfuscationKey::new();
    let mut data = datagram([0x80, 0x00], &[MsgAccepted { id: 5 }.into()]);
    data.extend_from_slice(&[Op::SERVER_ACCEPT.0, 5, 0]);

    let out = Interceptor::default().intercept_server(&key, &data);

    assert_eq!(&*out, data.as_slice());
    assert!(!key.is_set());
}

#[test]
fn test_server_info_name_prefixed() {
    let key = ObfuscationKey::new();
    let data = datagram([0x00, 0x00], &[server_info("Arena").into()]);

    let out = Interceptor::new("Relay: ").intercept_server(&key, &data);

    let (msg, _) = DecodeState::default().decode_next(&out[2..]).expect("decode");
    let info = match msg {
        Message::ServerInfo(info) => info,
        other => panic!("expected server info, got {other:?}"),
    };
    assert_eq!(info.server_name, "Relay: Arena");
    assert_eq!(info.map_name, "manamine");
    assert_eq!(out.len(), data.len() + "Relay: ".len());
    assert!(!key.is_set());
}

#[test]
fn test_server_info_full_width_map_prefixed() {
    let key = ObfuscationKey::new();
    let mut info = server_info("Arena");
    info.map_name = MapName(*b"ninechars");
    let data = datagram([0x00, 0x00], &[info.into()]);

    let out = Interceptor::default().intercept_server(&key, &data);

    assert!(matches!(out, Cow::Owned(_)));
    let (msg, _) = DecodeState::default().decode_next(&out[2..]).expect("decode");
    let info = match msg {
        Message::ServerInfo(info) => info,
        other => panic!("expected server info, got {other:?}"),
    };
    assert_eq!(info.server_name, "Proxy: Arena");
    assert_eq!(info.map_name.as_bytes(), b"ninechars");
}

#[test]
fn test_unrelated_datagram_untouched() {
    let key = ObfuscationKey::new();
    let data = datagram([0x81, 0x07], &[MsgTimestamp { timestamp: 3 }.into()]);
    let out = Interceptor::default().intercept_server(&key, &data);
    assert!(matches!(out, Cow::Borrowed(_)));
}

#[test]
fn test_split_concatenation_preserves_order() {
    let msgs: Vec<Message> = vec![
        MsgFullTimestamp { timestamp: 99 }.into(),
        MsgKeepAlive {}.into(),
        MsgServerDiscover { token: 7, version: 0x0104 }.into(),
        MsgTimestamp { timestamp: 100 }.into(),
    ];
    let payload = datagram([0, 0], &msgs)[2..].to_vec();

    let parts = split(&payload, &DecodeState::default());

    assert!(parts.fully_split);
    assert_eq!(parts.messages.len(), msgs.len());
    let joined: Vec<u8> = parts.messages.iter().flat_map(|m| m.raw.iter().copied()).collect();
    assert_eq!(joined, payload);
    for (part, msg) in parts.messages.iter().zip(&msgs) {
        assert_eq!(part.op, msg.op());
        assert_eq!(part.message.as_ref(), Some(msg));
    }
}

#[test]
fn test_split_uses_direction() {
    let payload = [Op::PING.0, 1, 0, 0, 0, Op::KEEP_ALIVE.0];

    let client = split(&payload, &DecodeState::new(true));
    assert!(client.fully_split);
    assert_eq!(client.messages.len(), 2);

    // From a server the ping carries one more byte and swallows the keep-alive.
    let server = split(&payload, &DecodeState::new(false));
    assert!(server.fully_split);
    assert_eq!(server.messages.len(), 1);
    assert_eq!(
        server.messages[0].message,
        Some(Message::Pong(MsgPong { token: 1, players: Op::KEEP_ALIVE.0 }))
    );
}

#[test]
fn test_single_unknown_byte_is_bare_message() {
    let parts = split(&[0xFF], &DecodeState::default());
    assert!(parts.fully_split);
    assert_eq!(parts.messages.len(), 1);
    assert_eq!(parts.messages[0].raw, &[0xFF]);
    assert!(parts.messages[0].message.as_ref().is_some_and(Message::is_unknown));
}

//! Property-based tests using proptest
//!
//! These tests check codec, splitter and obfuscation invariants across
//! randomly generated messages and frames.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use nox_relay::core::xor_in_place;
use nox_relay::protocol::message::{
    MapName, MsgAccepted, MsgFullTimestamp, MsgKeepAlive, MsgPing, MsgPong, MsgServerAccept,
    MsgServerDiscover, MsgServerInfo, MsgTextMessage, MsgTimestamp, NetMessage, MAP_NAME_LEN,
};
use nox_relay::protocol::{append, split, DecodeState, Message};
use proptest::prelude::*;

/// Messages a server may send.
fn server_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        (any::<u32>(), any::<u8>())
            .prop_map(|(token, players)| Message::from(MsgPong { token, players })),
        Just(Message::from(MsgKeepAlive {})),
        (any::<u32>(), any::<u8>()).prop_map(|(id, xor_key)| Message::from(MsgServerAccept { id, xor_key })),
        any::<u32>().prop_map(|id| Message::from(MsgAccepted { id })),
        any::<u32>().prop_map(|timestamp| Message::from(MsgFullTimestamp { timestamp })),
        any::<u16>().prop_map(|timestamp| Message::from(MsgTimestamp { timestamp })),
        (any::<u16>(), any::<u8>(), "[a-zA-Z0-9 ]{0,64}").prop_map(|(sender, flags, text)| {
            Message::from(MsgTextMessage { sender, flags, text })
        }),
        (
            any::<u8>(),
            any::<u8>(),
            any::<u16>(),
            any::<u32>(),
            any::<[u8; MAP_NAME_LEN]>(),
            "[a-zA-Z0-9 ]{0,32}",
        )
            .prop_map(|(players, max_players, flags, timestamp, map_name, server_name)| {
                Message::from(MsgServerInfo {
                    players,
                    max_players,
                    flags,
                    timestamp,
                    map_name: MapName(map_name),
                    server_name,
                })
            }),
    ]
}

fn client_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        any::<u32>().prop_map(|token| Message::from(MsgPing { token })),
        (any::<u32>(), any::<u32>())
            .prop_map(|(token, version)| Message::from(MsgServerDiscover { token, version })),
        Just(Message::from(MsgKeepAlive {})),
        any::<u16>().prop_map(|timestamp| Message::from(MsgTimestamp { timestamp })),
    ]
}

// Property: decoding an encoded message yields the same message and consumes all of it
proptest! {
    #[test]
    fn prop_server_message_roundtrip(msg in server_message()) {
        let bytes = msg.to_bytes().expect("encode should not fail");
        prop_assert_eq!(bytes.len(), msg.encoded_size());

        let (decoded, n) = DecodeState::new(false).decode_next(&bytes).expect("decode should not fail");
        prop_assert_eq!(n, bytes.len());
        prop_assert_eq!(decoded, msg);
    }
}

proptest! {
    #[test]
    fn prop_client_message_roundtrip(msg in client_message()) {
        let bytes = msg.to_bytes().expect("encode should not fail");
        let (decoded, n) = DecodeState::new(true).decode_next(&bytes).expect("decode should not fail");
        prop_assert_eq!(n, bytes.len());
        prop_assert_eq!(decoded, msg);
    }
}

// Property: a decoded server-info payload re-encodes to the same bytes,
// whatever the map field holds (full width, bytes after the terminator)
proptest! {
    #[test]
    fn prop_server_info_bytes_roundtrip(
        head in any::<[u8; 8]>(),
        map in any::<[u8; MAP_NAME_LEN]>(),
        name in "[a-zA-Z0-9 ]{0,32}",
    ) {
        let mut payload = head.to_vec();
        payload.extend_from_slice(&map);
        payload.extend_from_slice(name.as_bytes());
        payload.push(0);

        let (info, used) = MsgServerInfo::decode_payload(&payload).expect("decode should not fail");
        prop_assert_eq!(used, payload.len());
        prop_assert_eq!(info.map_name.as_bytes(), &map);

        let mut out = vec![0u8; info.payload_size()];
        info.encode_payload(&mut out).expect("encode should not fail");
        prop_assert_eq!(out, payload);
    }
}

// Property: fixed-length opcodes always encode to exactly their declared length
proptest! {
    #[test]
    fn prop_fixed_length_matches_table(msg in server_message()) {
        let bytes = msg.to_bytes().unwrap();
        if let Some(len) = msg.op().payload_len() {
            prop_assert_eq!(bytes.len(), len + 1);
        }
    }
}

// Property: a frame built from concatenated messages splits back into them
proptest! {
    #[test]
    fn prop_split_recovers_messages(msgs in prop::collection::vec(server_message(), 1..8)) {
        let mut frame = Vec::new();
        for msg in &msgs {
            append(&mut frame, msg).unwrap();
        }

        let parts = split(&frame, &DecodeState::new(false));
        prop_assert!(parts.fully_split);
        let decoded: Vec<Message> = parts
            .messages
            .iter()
            .map(|m| m.message.clone().expect("every part should decode"))
            .collect();
        prop_assert_eq!(decoded, msgs);
    }
}

// Property: split parts concatenate to the input, whatever the input
proptest! {
    #[test]
    fn prop_split_preserves_bytes(payload in prop::collection::vec(any::<u8>(), 0..512), is_client in any::<bool>()) {
        let parts = split(&payload, &DecodeState::new(is_client));
        let joined: Vec<u8> = parts.messages.iter().flat_map(|m| m.raw.iter().copied()).collect();
        prop_assert_eq!(&joined, &payload);
        prop_assert!(parts.messages.iter().all(|m| !m.raw.is_empty()));
    }
}

// Property: XOR obfuscation is an involution for every key
proptest! {
    #[test]
    fn prop_xor_involution(key in any::<u8>(), data in prop::collection::vec(any::<u8>(), 0..2048)) {
        let mut buf = data.clone();
        xor_in_place(key, &mut buf);
        xor_in_place(key, &mut buf);
        prop_assert_eq!(buf, data);
    }
}

#[test]
fn test_xor_empty_buffer() {
    let mut buf: [u8; 0] = [];
    xor_in_place(0x37, &mut buf);
    assert!(buf.is_empty());
}

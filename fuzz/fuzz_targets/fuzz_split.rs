#![no_main]

use libfuzzer_sys::fuzz_target;
use nox_relay::protocol::{split, DecodeState};

fuzz_target!(|data: &[u8]| {
    // First byte picks the direction; the rest is a frame payload.
    let Some((&dir, payload)) = data.split_first() else {
        return;
    };
    let parts = split(payload, &DecodeState::new(dir & 1 == 1));
    let joined: Vec<u8> = parts.messages.iter().flat_map(|m| m.raw.iter().copied()).collect();
    assert_eq!(joined, payload);
});

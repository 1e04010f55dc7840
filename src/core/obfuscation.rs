//! Single-byte XOR obfuscation used by the game after the handshake.
//!
//! The key is learned once from the server-accept message and then applied
//! to every byte exchanged between the relay and the real server. XOR is its
//! own inverse, so the same call scrambles and unscrambles.

use std::sync::atomic::{AtomicU8, Ordering};

/// XOR every byte of `data` with `key` in place.
#[inline]
pub fn xor_in_place(key: u8, data: &mut [u8]) {
    for b in data.iter_mut() {
        *b ^= key;
    }
}

/// Per-port obfuscation key. Zero means no obfuscation.
///
/// Transitions at most once from zero to a real key; readers may observe a
/// stale zero for the datagram that is in flight while the key is stored.
#[derive(Debug, Default)]
pub struct ObfuscationKey(AtomicU8);

impl ObfuscationKey {
    pub fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, key: u8) {
        self.0.store(key, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.get() != 0
    }

    /// Apply the current key to `data`; a no-op while no key is known.
    pub fn apply(&self, data: &mut [u8]) {
        let key = self.get();
        if key != 0 {
            xor_in_place(key, data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_key_is_noop() {
        let key = ObfuscationKey::new();
        let mut data = [1u8, 2, 3];
        key.apply(&mut data);
        assert_eq!(data, [1, 2, 3]);
        assert!(!key.is_set());
    }

    #[test]
    fn test_set_key_scrambles() {
        let key = ObfuscationKey::new();
        key.set(0x37);
        let mut data = [0x00u8, 0x37, 0xFF];
        key.apply(&mut data);
        assert_eq!(data, [0x37, 0x00, 0xC8]);
    }
}

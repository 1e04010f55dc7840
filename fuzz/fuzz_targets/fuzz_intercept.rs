#![no_main]

use libfuzzer_sys::fuzz_target;
use nox_relay::core::ObfuscationKey;
use nox_relay::protocol::Interceptor;

fuzz_target!(|data: &[u8]| {
    // Rewriting must never panic, whatever the server sends.
    let key = ObfuscationKey::new();
    let _ = Interceptor::default().intercept_server(&key, data);
});

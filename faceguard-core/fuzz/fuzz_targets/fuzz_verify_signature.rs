#![no_main]

//! Fuzz target for signature verification
//!
//! The first byte picks how much of the input is the claimed signature; the
//! rest is the message. Verification must never panic, and must only accept
//! the exact signature produced by `sign`.
//!
//! Run with: cargo +nightly fuzz run fuzz_verify_signature

use faceguard_core::signature::{sign, verify, SharedSecret};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = (split as usize).min(rest.len());
    let (claimed, message) = rest.split_at(split);
    let claimed = String::from_utf8_lossy(claimed);

    let Ok(secret) = SharedSecret::new(b"fuzz-secret".to_vec()) else {
        return;
    };
    if let Ok(true) = verify(&secret, message, &claimed) {
        let expected = sign(&secret, message).ok();
        assert_eq!(expected.as_deref(), Some(claimed.as_ref()));
    }
});

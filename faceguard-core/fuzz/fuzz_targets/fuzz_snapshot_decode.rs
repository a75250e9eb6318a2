#![no_main]

//! Fuzz target for IdentitySnapshot::from_cbor()
//!
//! Arbitrary bytes must either decode into a snapshot that passes validation
//! or fail with an error. Decoded snapshots are queried once to exercise the
//! distance code on whatever dimensions survived validation.
//!
//! Run with: cargo +nightly fuzz run fuzz_snapshot_decode

use faceguard_core::{EmbeddingVector, IdentitySnapshot};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(snapshot) = IdentitySnapshot::from_cbor(data) {
        if let Some(dimension) = snapshot.metadata().dimension {
            if let Ok(probe) = EmbeddingVector::new(vec![0.5; dimension]) {
                let _ = snapshot.query(&probe, 1);
            }
        }
    }
});

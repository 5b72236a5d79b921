// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Fuzz target for varint (LEB128) encoding/decoding.
//!
//! Every length, count and delta in a block segment is a varint. A decoder
//! that panics on garbage turns a corrupt file into a crashed harness.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sorex_conformance::binary::encoding::{decode_varint, encode_varint};
use sorex_conformance::binary::header::MAX_VARINT_BYTES;

fuzz_target!(|data: &[u8]| {
    // Ok or Err, never a panic
    if let Ok((value, consumed)) = decode_varint(data) {
        assert!(consumed >= 1 && consumed <= data.len());
        assert!(consumed <= MAX_VARINT_BYTES, "varint consumed {} bytes", consumed);

        let mut reencoded = Vec::new();
        encode_varint(value, &mut reencoded);
        let (redecoded, reconsumed) =
            decode_varint(&reencoded).expect("re-encoding of a decoded value must decode");
        assert_eq!(value, redecoded);
        assert_eq!(reconsumed, reencoded.len());
        // Canonical form is never longer than what we accepted
        assert!(reencoded.len() <= consumed);
    }
});

// SPDX-License-Identifier: MIT OR Apache-2.0
#![no_main]

use affect_compress::{decode_timestamps, encode_timestamps};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must never panic the varint decoder.
    if let Ok(timestamps) = decode_timestamps(data) {
        let reencoded = encode_timestamps(&timestamps);
        assert_eq!(decode_timestamps(&reencoded).ok(), Some(timestamps));
    }
});

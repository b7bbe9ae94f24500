// SPDX-License-Identifier: MIT OR Apache-2.0
#![no_main]

use affect_compress::{check_segments, decoded_len, rle_decode, rle_encode, RleEncoder};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct RleInput {
    runs: Vec<(u8, u8)>,
}

fuzz_target!(|input: RleInput| {
    // Expand short (value, length) pairs so long runs show up often.
    let symbols: Vec<u8> = input
        .runs
        .iter()
        .take(256)
        .flat_map(|&(value, len)| std::iter::repeat(value).take(usize::from(len) * 16))
        .collect();

    let segments = rle_encode(&symbols);
    assert!(check_segments(&segments).is_ok());
    assert_eq!(decoded_len(&segments), symbols.len());
    assert_eq!(rle_decode(&segments), symbols, "RLE roundtrip failed");

    let mut encoder = RleEncoder::new();
    for &symbol in &symbols {
        encoder.push(symbol);
    }
    assert_eq!(encoder.finish(), segments);
});

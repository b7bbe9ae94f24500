// SPDX-License-Identifier: MIT OR Apache-2.0
//! Delta codec on arbitrary values: either a faithful roundtrip or a clean
//! error, never a wrapped delta.

#![no_main]

use affect_compress::{DeltaDecoder, DeltaEncoder};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct DeltaInput {
    scale_exp: u8,
    values: Vec<f32>,
}

fuzz_target!(|input: DeltaInput| {
    let scale = 10f32.powi(i32::from(input.scale_exp % 5));
    let mut encoder = DeltaEncoder::new(scale);
    let mut decoder = DeltaDecoder::new(scale);

    for &value in input.values.iter().take(1024) {
        let before = encoder.state();
        match encoder.encode(value) {
            Ok(delta) => {
                let decoded = decoder.decode(delta).expect("decoder overflow on valid delta");
                let tolerance = 0.5 / scale + value.abs() * f32::EPSILON * 4.0;
                assert!(
                    (decoded - value).abs() <= tolerance,
                    "{value} decoded as {decoded} at scale {scale}"
                );
            },
            Err(_) => assert_eq!(encoder.state(), before, "state changed on error"),
        }
    }
});

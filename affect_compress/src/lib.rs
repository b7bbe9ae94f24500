// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compression for low-entropy affective signal streams.
//!
//! Provides the codecs a storage session is built from:
//! - Delta encoding of fixed-point samples into 16-bit differences
//! - Zigzag varint delta encoding for timestamps
//! - Run-length encoding for discrete event symbols
//! - Bucket quantization of samples into `u8` symbols
//!
//! The delta codec is lossy within half a fixed-point step; the run-length
//! codec is lossless.

mod delta;
mod error;
mod quantize;
mod rle;

pub mod format;

pub use delta::{
    decode_all, decode_timestamps, encode_all, encode_timestamps, varint_decode, varint_encode,
    DeltaCodecState, DeltaDecoder, DeltaEncoder, TimestampEncoder, DEFAULT_SCALE,
};
pub use error::{CodecError, Result};
pub use format::{DecodedStreams, Event, RecordEncoder, Sample, SessionRecord, MAGIC};
pub use quantize::{QuantizationError, Quantizer, DEFAULT_BUCKETS};
pub use rle::{check_segments, decoded_len, rle_decode, rle_encode, RleEncoder, RleSegment, MAX_RUN};

/// A bucketed sample or categorical event.
pub type QuantizedSymbol = u8;

// SPDX-License-Identifier: MIT OR Apache-2.0
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("delta overflow: {previous} -> {next} does not fit in 16 bits")]
    Overflow { previous: i64, next: i64 },

    #[error("non-finite sample value")]
    NonFinite,

    #[error("truncated varint stream at byte {0}")]
    Truncated(usize),

    #[error("invalid magic bytes")]
    InvalidMagic,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u16),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("corrupt run-length segments: {0}")]
    CorruptSegments(String),
}

impl From<bincode::Error> for CodecError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = CodecError::Overflow {
            previous: 100,
            next: 40_000,
        };
        assert_eq!(
            e.to_string(),
            "delta overflow: 100 -> 40000 does not fit in 16 bits"
        );

        let e = CodecError::Truncated(7);
        assert_eq!(e.to_string(), "truncated varint stream at byte 7");

        let e = CodecError::UnsupportedVersion(9);
        assert_eq!(e.to_string(), "unsupported version: 9");

        let e = CodecError::CorruptSegments("empty run at segment 3".to_string());
        assert_eq!(e.to_string(), "corrupt run-length segments: empty run at segment 3");
    }

    #[test]
    fn test_from_bincode_error() {
        let bad: &[u8] = &[0xff, 0xff, 0xff];
        let result: std::result::Result<String, _> = bincode::deserialize(bad);
        if let Err(e) = result {
            let codec_err: CodecError = e.into();
            assert!(matches!(codec_err, CodecError::Serialization(_)));
        }
    }
}

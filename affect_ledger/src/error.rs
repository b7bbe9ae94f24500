// SPDX-License-Identifier: MIT OR Apache-2.0
use affect_compress::CodecError;
use affect_vault::AccessError;
use thiserror::Error;

use crate::session::SessionState;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("access error: {0}")]
    Access(#[from] AccessError),

    #[error("{operation} not allowed in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("ledger error: {0}")]
    Ledger(String),
}

impl SessionError {
    /// Name of the component that produced the failure.
    pub fn component(&self) -> &'static str {
        match self {
            Self::Codec(CodecError::Overflow { .. } | CodecError::NonFinite) => "delta codec",
            Self::Codec(CodecError::CorruptSegments(_)) => "run-length codec",
            Self::Codec(_) => "record format",
            Self::Access(_) => "access control",
            Self::InvalidState { .. } => "session",
            Self::InvalidConfig(_) => "configuration",
            Self::Ledger(_) => "ledger",
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

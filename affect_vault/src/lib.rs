// SPDX-License-Identifier: MIT OR Apache-2.0
//! Affect Vault: per-session access control.
//!
//! A session has one owner with implicit full access, an explicit set of
//! read/write grantees, an optional read-only set and a public flag that
//! opens reads to everyone. Every successful access is appended to a
//! hash-chained audit log; denied attempts are not logged. The chain is
//! keyed when an [`AuditKey`] is supplied.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::cast_possible_truncation)]

mod access;
mod audit;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use access::{AccessControl, AccessSnapshot};
pub use audit::{AccessEntry, AuditCheckpoint, AuditKey, AuditLog, GENESIS_DIGEST};

/// Opaque principal identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of access being gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessKind {
    Read,
    Write,
    Delete,
}

impl AccessKind {
    /// Stable byte used in audit digests.
    pub fn tag(self) -> u8 {
        match self {
            Self::Read => 1,
            Self::Write => 2,
            Self::Delete => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grant level for a non-owner principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Permission {
    /// Read only.
    #[default]
    Read,
    /// Read and write. Delete stays with the owner.
    Write,
}

impl Permission {
    pub fn allows(self, kind: AccessKind) -> bool {
        matches!(
            (self, kind),
            (Self::Write, AccessKind::Read | AccessKind::Write) | (Self::Read, AccessKind::Read)
        )
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("access denied: {principal} may not {kind}")]
    Denied { principal: Identity, kind: AccessKind },

    #[error("{0} is not the owner")]
    NotOwner(Identity),

    #[error("owner access is implicit and cannot be granted")]
    OwnerImplicit,

    #[error("audit log tampered at entry {sequence}")]
    TamperedLog { sequence: u64 },

    #[error("access snapshot: {0}")]
    Snapshot(String),

    #[error("audit key rejected by the MAC")]
    InvalidKey,
}

pub type Result<T> = std::result::Result<T, AccessError>;

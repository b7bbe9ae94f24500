// SPDX-License-Identifier: MIT OR Apache-2.0
//! Append-only access log.
//!
//! Each entry carries a 32-byte link over its own fields and the previous
//! entry's link. Without a key the link is BLAKE2b-256; with an
//! [`AuditKey`] it is a BLAKE2b MAC, so the chain cannot be rebuilt by
//! anyone who lacks the key. An edit, reorder or removal inside the log
//! breaks every later link and is caught by [`AuditLog::verify`]. A log cut
//! short at the tail is still a valid chain; it is caught by comparing
//! against an [`AuditCheckpoint`] kept beside the snapshot.

use std::fmt;

use blake2::{digest::consts::U32, digest::Mac, Blake2b, Blake2bMac512, Digest};
use serde::{Deserialize, Serialize};

use crate::{AccessError, AccessKind, Identity, Result};

/// Digest the first entry chains from.
pub const GENESIS_DIGEST: [u8; 32] = [0; 32];

/// Secret that keys the audit chain. Never serialized.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AuditKey([u8; 32]);

impl AuditKey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for AuditKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuditKey(..)")
    }
}

/// Length and head link of a log at the moment it was snapshotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditCheckpoint {
    pub len: u64,
    pub head: [u8; 32],
}

/// One successful access.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessEntry {
    pub principal: Identity,
    /// Unix milliseconds, never earlier than the previous entry's.
    pub timestamp: u64,
    pub kind: AccessKind,
    /// Insertion index, starting at zero.
    pub sequence: u64,
    pub digest: [u8; 32],
}

fn link_fields(
    prev: &[u8; 32],
    principal: &Identity,
    timestamp: u64,
    kind: AccessKind,
    sequence: u64,
    mut feed: impl FnMut(&[u8]),
) {
    feed(prev);
    feed(&sequence.to_le_bytes());
    feed(&timestamp.to_le_bytes());
    feed(&[kind.tag()]);
    feed(principal.as_str().as_bytes());
}

fn link_digest(
    key: Option<&AuditKey>,
    prev: &[u8; 32],
    principal: &Identity,
    timestamp: u64,
    kind: AccessKind,
    sequence: u64,
) -> Result<[u8; 32]> {
    let mut digest = [0u8; 32];
    match key {
        None => {
            let mut hasher = Blake2b::<U32>::new();
            link_fields(prev, principal, timestamp, kind, sequence, |bytes| {
                hasher.update(bytes);
            });
            digest.copy_from_slice(&hasher.finalize());
        },
        Some(key) => {
            let mut mac = <Blake2bMac512 as Mac>::new_from_slice(key.as_bytes())
                .map_err(|_| AccessError::InvalidKey)?;
            link_fields(prev, principal, timestamp, kind, sequence, |bytes| {
                mac.update(bytes);
            });
            digest.copy_from_slice(&mac.finalize().into_bytes()[..32]);
        },
    }
    Ok(digest)
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Hash-chained log. Entries can only be appended.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditLog {
    entries: Vec<AccessEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(
        &mut self,
        key: Option<&AuditKey>,
        principal: &Identity,
        kind: AccessKind,
        timestamp: u64,
    ) -> Result<()> {
        let (prev, sequence, floor) = self.entries.last().map_or((GENESIS_DIGEST, 0, 0), |e| {
            (e.digest, e.sequence + 1, e.timestamp)
        });
        // Clamp so timestamp order always agrees with insertion order.
        let timestamp = timestamp.max(floor);
        let digest = link_digest(key, &prev, principal, timestamp, kind, sequence)?;
        self.entries.push(AccessEntry {
            principal: principal.clone(),
            timestamp,
            kind,
            sequence,
            digest,
        });
        Ok(())
    }

    pub fn entries(&self) -> &[AccessEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Digest of the newest entry, or [`GENESIS_DIGEST`] when empty.
    pub fn head(&self) -> [u8; 32] {
        self.entries.last().map_or(GENESIS_DIGEST, |e| e.digest)
    }

    pub fn checkpoint(&self) -> AuditCheckpoint {
        AuditCheckpoint {
            len: self.entries.len() as u64,
            head: self.head(),
        }
    }

    /// Recompute the chain from genesis under `key`.
    ///
    /// # Errors
    /// `TamperedLog` with the first entry whose link does not verify.
    pub fn verify(&self, key: Option<&AuditKey>) -> Result<()> {
        let mut prev = GENESIS_DIGEST;
        let mut floor = 0;
        for (i, entry) in self.entries.iter().enumerate() {
            let expected_sequence = i as u64;
            let link = link_digest(
                key,
                &prev,
                &entry.principal,
                entry.timestamp,
                entry.kind,
                entry.sequence,
            )?;
            let tampered = entry.sequence != expected_sequence
                || entry.timestamp < floor
                || !constant_time_eq(&link, &entry.digest);
            if tampered {
                return Err(AccessError::TamperedLog {
                    sequence: expected_sequence,
                });
            }
            prev = entry.digest;
            floor = entry.timestamp;
        }
        Ok(())
    }

    /// Check that this log still reaches `checkpoint`: at least as many
    /// entries, and the entry at the checkpoint's head carries its link.
    ///
    /// # Errors
    /// `TamperedLog` at the first missing entry when the log is shorter, or
    /// at the checkpoint's head when the links differ.
    pub fn verify_checkpoint(&self, checkpoint: &AuditCheckpoint) -> Result<()> {
        let len = self.entries.len() as u64;
        if len < checkpoint.len {
            return Err(AccessError::TamperedLog { sequence: len });
        }
        let head = match checkpoint.len {
            0 => GENESIS_DIGEST,
            n => self.entries[(n - 1) as usize].digest,
        };
        if !constant_time_eq(&head, &checkpoint.head) {
            return Err(AccessError::TamperedLog {
                sequence: checkpoint.len.saturating_sub(1),
            });
        }
        Ok(())
    }

    pub fn by_principal(&self, principal: &Identity) -> Vec<&AccessEntry> {
        self.entries
            .iter()
            .filter(|e| &e.principal == principal)
            .collect()
    }

    pub fn since(&self, since_millis: u64) -> Vec<&AccessEntry> {
        self.entries
            .iter()
            .filter(|e| e.timestamp >= since_millis)
            .collect()
    }

    /// Last `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<&AccessEntry> {
        self.entries.iter().rev().take(limit).collect()
    }
}

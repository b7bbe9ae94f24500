// SPDX-License-Identifier: MIT OR Apache-2.0
//! Hand-off points to whatever persists sealed blobs.

use std::collections::HashMap;

use affect_vault::AccessSnapshot;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Result, SessionError};
use crate::session::SealedBlob;

/// Persists sealed blobs. Implementations own retries and transport.
pub trait LedgerWriter {
    /// # Errors
    /// `SessionError::Ledger` when the blob could not be stored.
    fn persist(&mut self, blob: &SealedBlob, access: &AccessSnapshot) -> Result<()>;
}

/// A blob as stored, together with the access snapshot written beside it.
///
/// The blob keeps the efficiency report produced at seal time; reopening
/// hands that report back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub blob: SealedBlob,
    pub access_snapshot: AccessSnapshot,
}

/// Loads previously persisted blobs for reopening.
pub trait LedgerReader {
    /// # Errors
    /// `SessionError::Ledger` when `session_id` is unknown or unreadable.
    fn load(&self, session_id: Uuid) -> Result<StoredBlob>;
}

/// In-process ledger keyed by session id.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    blobs: RwLock<HashMap<Uuid, StoredBlob>>,
    byte_limit: Option<u64>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject persists that would push the stored total past `limit` bytes.
    pub fn with_byte_limit(mut self, limit: u64) -> Self {
        self.byte_limit = Some(limit);
        self
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    pub fn contains(&self, session_id: Uuid) -> bool {
        self.blobs.read().contains_key(&session_id)
    }

    /// Total compressed bytes held.
    pub fn stored_bytes(&self) -> u64 {
        self.blobs
            .read()
            .values()
            .map(|stored| stored.blob.compressed_bytes.len() as u64)
            .sum()
    }

    /// Sum of estimated costs over all stored blobs.
    pub fn total_estimated_cost(&self) -> f64 {
        self.blobs
            .read()
            .values()
            .map(|stored| stored.blob.efficiency_report.estimated_cost)
            .sum()
    }
}

impl LedgerWriter for MemoryLedger {
    fn persist(&mut self, blob: &SealedBlob, access: &AccessSnapshot) -> Result<()> {
        let mut blobs = self.blobs.write();
        if blobs.contains_key(&blob.session_id) {
            return Err(SessionError::Ledger(format!(
                "session {} already persisted",
                blob.session_id
            )));
        }
        if let Some(limit) = self.byte_limit {
            let held: u64 = blobs
                .values()
                .map(|stored| stored.blob.compressed_bytes.len() as u64)
                .sum();
            let needed = held + blob.compressed_bytes.len() as u64;
            if needed > limit {
                return Err(SessionError::Ledger(format!(
                    "byte limit exceeded: {needed} > {limit}"
                )));
            }
        }
        blobs.insert(
            blob.session_id,
            StoredBlob {
                blob: blob.clone(),
                access_snapshot: access.clone(),
            },
        );
        Ok(())
    }
}

impl LedgerReader for MemoryLedger {
    fn load(&self, session_id: Uuid) -> Result<StoredBlob> {
        self.blobs
            .read()
            .get(&session_id)
            .cloned()
            .ok_or_else(|| SessionError::Ledger(format!("session {session_id} not found")))
    }
}

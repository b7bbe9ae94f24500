// SPDX-License-Identifier: MIT OR Apache-2.0
//! Affect Ledger: storage sessions for cost-bearing persistence.
//!
//! A [`StorageSession`] ingests timestamped samples and events, seals them
//! into a compact blob, trains the shared sequence predictor on the
//! session's symbol trail and reports how much the compression saved
//! against the configured per-byte storage cost.
//!
//! - Samples go through the delta codec, events through the run-length codec
//! - Sealed blobs are handed to a [`LedgerWriter`] with an access snapshot
//! - Persisted blobs come back through [`LedgerReader`] and
//!   [`StorageSession::reopen`]
//! - Reads are gated by the session's [`affect_vault::AccessControl`]

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod cost;
mod error;
mod ledger;
mod session;

pub use config::{SessionConfig, DEFAULT_RATIO_WEIGHT};
pub use cost::{
    efficiency_score, estimate_cost, ratio, CostModel, EfficiencyReport, MAX_SPEED_POINTS,
};
pub use error::{Result, SessionError};
pub use ledger::{LedgerReader, LedgerWriter, MemoryLedger, StoredBlob};
pub use session::{SealedBlob, SessionContents, SessionState, SessionStats, StorageSession};

// Collaborator-facing types, so callers need only this crate.
pub use affect_compress::{Event, QuantizedSymbol, Sample};
pub use affect_predict::{PredictorConfig, SequencePredictor};
pub use affect_vault::{AccessControl, AccessKind, AccessSnapshot, AuditKey, Identity, Permission};
pub use uuid::Uuid;

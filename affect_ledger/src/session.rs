// SPDX-License-Identifier: MIT OR Apache-2.0
//! Storage session lifecycle.
//!
//! A session moves `Open -> Sealed -> Closed`. Any codec failure while
//! ingesting moves it to `Failed`, which is terminal: `close` releases its
//! buffers but the state stays `Failed`.
//! Ingest and seal take `&mut self`; reads of a sealed session take `&self`
//! and only serialize on the access-control mutex.

use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use affect_compress::{CodecError, Event, QuantizedSymbol, Quantizer, RecordEncoder, Sample, SessionRecord};
use affect_predict::{SequencePredictor, TrainingSequence};
use affect_vault::{AccessControl, AccessEntry, AccessKind, AccessSnapshot, Identity, Permission};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::cost::{CostModel, EfficiencyReport};
use crate::error::{Result, SessionError};
use crate::ledger::{LedgerReader, LedgerWriter, StoredBlob};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Open,
    Sealed,
    Closed,
    /// Terminal. Entered on a codec failure; never left, not even by `close`.
    Failed,
}

/// Output of a successful seal, ready for a ledger writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedBlob {
    pub session_id: Uuid,
    pub compressed_bytes: Vec<u8>,
    pub efficiency_report: EfficiencyReport,
}

/// Everything a permitted reader gets back from a sealed session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContents {
    pub samples: Vec<Sample>,
    pub events: Vec<Event>,
    pub report: EfficiencyReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub state: SessionState,
    pub samples: u64,
    pub events: u64,
    /// RLE segments in the sealed record; `None` until sealed.
    pub segments: Option<usize>,
    /// Symbols contributed to the predictor trail.
    pub trail_len: usize,
    pub audit_entries: usize,
    /// Rolling accuracy of the shared predictor.
    pub prediction_accuracy: Option<f32>,
}

#[derive(Debug)]
struct Sealed {
    record: SessionRecord,
    blob: SealedBlob,
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// One recording session: codecs, symbol trail, access control and, once
/// sealed, the immutable blob.
#[derive(Debug)]
pub struct StorageSession {
    id: Uuid,
    config: SessionConfig,
    cost: CostModel,
    quantizer: Quantizer,
    predictor: Arc<SequencePredictor>,
    access: Mutex<AccessControl>,
    state: SessionState,
    encoder: RecordEncoder,
    trail: Vec<QuantizedSymbol>,
    trail_len: usize,
    encode_time: Duration,
    sealed: Option<Sealed>,
}

impl StorageSession {
    /// # Errors
    /// `InvalidConfig` if `config` does not validate or `predictor` was
    /// built with other history or window settings.
    pub fn open(
        config: SessionConfig,
        owner: impl Into<Identity>,
        predictor: Arc<SequencePredictor>,
    ) -> Result<Self> {
        let quantizer = Self::prepare(&config, &predictor)?;
        let access = AccessControl::new(owner)
            .with_owner_logging(config.log_owner_access)
            .with_audit_key(config.audit_key);

        let session = Self {
            id: Uuid::new_v4(),
            config,
            cost: CostModel::from_config(&config),
            quantizer,
            predictor,
            access: Mutex::new(access),
            state: SessionState::Open,
            encoder: RecordEncoder::new(config.scale_factor, config.quantization_buckets),
            trail: Vec::new(),
            trail_len: 0,
            encode_time: Duration::ZERO,
            sealed: None,
        };
        info!(session_id = %session.id, owner = %session.owner(), "session opened");
        Ok(session)
    }

    /// Rebuild a sealed session from persisted bytes and an access control
    /// the caller already holds.
    ///
    /// The header and every stream are decoded up front and the audit chain
    /// is verified under `config.audit_key`. The header's scale and bucket
    /// count must match `config`. The efficiency report is recomputed from
    /// the stored header, so it matches the one produced at seal time for
    /// the same config; [`StorageSession::from_stored`] additionally checks
    /// it against the persisted report.
    ///
    /// # Errors
    /// `InvalidConfig`, `Access(TamperedLog)` or any codec error.
    pub fn reopen(
        session_id: Uuid,
        bytes: &[u8],
        access: AccessControl,
        config: SessionConfig,
        predictor: Arc<SequencePredictor>,
    ) -> Result<Self> {
        Self::restore_sealed(session_id, bytes, access, config, predictor, None)
    }

    fn restore_sealed(
        session_id: Uuid,
        bytes: &[u8],
        access: AccessControl,
        config: SessionConfig,
        predictor: Arc<SequencePredictor>,
        persisted: Option<&EfficiencyReport>,
    ) -> Result<Self> {
        let quantizer = Self::prepare(&config, &predictor)?;
        let access = access.with_audit_key(config.audit_key);
        if let Err(e) = access.verify() {
            warn!(session_id = %session_id, error = %e, "rejecting access snapshot");
            return Err(e.into());
        }

        let record = SessionRecord::deserialize(bytes)?;
        let header = &record.header;
        if header.scale_factor.to_bits() != config.scale_factor.to_bits()
            || header.quantization_buckets != config.quantization_buckets
        {
            return Err(SessionError::InvalidConfig(format!(
                "record was sealed with scale {} and {} buckets, config has scale {} and {} buckets",
                header.scale_factor,
                header.quantization_buckets,
                config.scale_factor,
                config.quantization_buckets
            )));
        }
        let streams = record.decode()?;
        let cost = CostModel::from_config(&config);
        let encode_duration_ms = header.encode_duration_ms;
        let report = cost.report(header.original_bytes(), bytes.len() as u64, encode_duration_ms);
        if let Some(persisted) = persisted {
            if *persisted != report {
                warn!(session_id = %session_id, "config does not reproduce the persisted report");
                return Err(SessionError::InvalidConfig(format!(
                    "cost settings give estimated cost {} where {} was persisted",
                    report.estimated_cost, persisted.estimated_cost
                )));
            }
        }

        info!(
            session_id = %session_id,
            samples = streams.samples.len(),
            events = streams.events.len(),
            "session reopened"
        );
        Ok(Self {
            id: session_id,
            config,
            cost,
            quantizer,
            predictor,
            access: Mutex::new(access),
            state: SessionState::Sealed,
            encoder: RecordEncoder::new(config.scale_factor, config.quantization_buckets),
            trail: Vec::new(),
            trail_len: 0,
            encode_time: Duration::from_millis(u64::from(encode_duration_ms)),
            sealed: Some(Sealed {
                blob: SealedBlob {
                    session_id,
                    compressed_bytes: bytes.to_vec(),
                    efficiency_report: report,
                },
                record,
            }),
        })
    }

    /// Reopen from a blob as returned by a [`LedgerReader`].
    ///
    /// The access snapshot must still reach its stored audit checkpoint, and
    /// `config` must reproduce the persisted efficiency report exactly.
    ///
    /// # Errors
    /// As [`StorageSession::reopen`], plus `Access(Snapshot)` for an
    /// undecodable access snapshot and `Access(TamperedLog)` for a truncated
    /// audit log.
    pub fn from_stored(
        stored: &StoredBlob,
        config: SessionConfig,
        predictor: Arc<SequencePredictor>,
    ) -> Result<Self> {
        let session_id = stored.blob.session_id;
        let access = AccessControl::restore(&stored.access_snapshot, config.audit_key).map_err(|e| {
            warn!(session_id = %session_id, error = %e, "rejecting access snapshot");
            SessionError::from(e)
        })?;
        Self::restore_sealed(
            session_id,
            &stored.blob.compressed_bytes,
            access,
            config,
            predictor,
            Some(&stored.blob.efficiency_report),
        )
    }

    /// # Errors
    /// `Ledger` if the reader has nothing for `session_id`, otherwise as
    /// [`StorageSession::from_stored`].
    pub fn load<R: LedgerReader + ?Sized>(
        reader: &R,
        session_id: Uuid,
        config: SessionConfig,
        predictor: Arc<SequencePredictor>,
    ) -> Result<Self> {
        let stored = reader.load(session_id)?;
        Self::from_stored(&stored, config, predictor)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn owner(&self) -> Identity {
        self.access.lock().owner().clone()
    }

    pub fn predictor(&self) -> &Arc<SequencePredictor> {
        &self.predictor
    }

    /// The sealed blob, kept so it can be re-sent after a failed persist.
    pub fn sealed_blob(&self) -> Option<&SealedBlob> {
        self.sealed.as_ref().map(|sealed| &sealed.blob)
    }

    pub fn report(&self) -> Option<&EfficiencyReport> {
        self.sealed.as_ref().map(|sealed| &sealed.blob.efficiency_report)
    }

    /// # Errors
    /// `InvalidState` unless open; `Codec` (and state `Failed`) if the delta
    /// codec rejects the value.
    pub fn ingest_sample(&mut self, sample: Sample) -> Result<()> {
        self.require(SessionState::Open, "ingest_sample")?;
        let start = Instant::now();

        if let Err(e) = self.encoder.push_sample(sample) {
            self.state = SessionState::Failed;
            warn!(session_id = %self.id, timestamp = sample.timestamp, error = %e, "sample rejected, session failed");
            return Err(e.into());
        }
        self.observe(self.quantizer.quantize(sample.value));

        self.encode_time += start.elapsed();
        Ok(())
    }

    /// # Errors
    /// `InvalidState` unless open.
    pub fn ingest_event(&mut self, event: Event) -> Result<()> {
        self.require(SessionState::Open, "ingest_event")?;
        let start = Instant::now();

        self.encoder.push_event(event);
        self.observe(event.symbol);

        self.encode_time += start.elapsed();
        Ok(())
    }

    /// Flush the codecs, serialize the record, train the shared predictor on
    /// this session's trail and produce the efficiency report.
    ///
    /// # Errors
    /// `InvalidState` unless open; `Codec` (and state `Failed`) if the
    /// record cannot be serialized. No blob exists after a failed seal.
    pub fn seal(&mut self) -> Result<SealedBlob> {
        self.require(SessionState::Open, "seal")?;
        let start = Instant::now();

        let encoder = mem::replace(
            &mut self.encoder,
            RecordEncoder::new(self.config.scale_factor, self.config.quantization_buckets),
        );
        let mut record = encoder.finish(0);
        // Covers ingest plus the codec flush; serialization needs the
        // finished header and is not counted.
        let duration_ms = millis(self.encode_time + start.elapsed());
        record.header.encode_duration_ms = duration_ms;
        let compressed_bytes = match record.serialize() {
            Ok(bytes) => bytes,
            Err(e) => {
                self.state = SessionState::Failed;
                warn!(session_id = %self.id, error = %e, "seal failed");
                return Err(e.into());
            },
        };

        let trail = TrainingSequence::new(mem::take(&mut self.trail));
        if trail.transitions() > 0 {
            self.predictor.admit_and_retrain(trail);
        }

        let report = self.cost.report(
            record.header.original_bytes(),
            compressed_bytes.len() as u64,
            duration_ms,
        );
        let blob = SealedBlob {
            session_id: self.id,
            compressed_bytes,
            efficiency_report: report,
        };

        info!(
            session_id = %self.id,
            original_bytes = report.original_bytes,
            compressed_bytes = report.compressed_bytes,
            ratio = report.ratio,
            estimated_cost = report.estimated_cost,
            "session sealed"
        );
        self.state = SessionState::Sealed;
        self.sealed = Some(Sealed {
            record,
            blob: blob.clone(),
        });
        Ok(blob)
    }

    /// Seal, then hand the blob and an access snapshot to `writer`.
    ///
    /// If the writer fails the session stays sealed and the error is
    /// `Ledger`; the blob is still available from
    /// [`StorageSession::sealed_blob`].
    ///
    /// # Errors
    /// As [`StorageSession::seal`], or `Ledger` if persisting fails.
    pub fn seal_into<W: LedgerWriter + ?Sized>(&mut self, writer: &mut W) -> Result<SealedBlob> {
        let blob = self.seal()?;
        let snapshot = self.access_snapshot()?;
        if let Err(e) = writer.persist(&blob, &snapshot) {
            warn!(session_id = %self.id, error = %e, "ledger persist failed");
            return Err(match e {
                SessionError::Ledger(_) => e,
                other => SessionError::Ledger(other.to_string()),
            });
        }
        Ok(blob)
    }

    /// Decode the sealed streams for `principal`.
    ///
    /// # Errors
    /// `InvalidState` unless sealed, `Access(Denied)` if `principal` may not
    /// read, or a codec error if the record fails to decode.
    pub fn read(&self, principal: &Identity) -> Result<SessionContents> {
        let sealed = self.sealed_or("read")?;
        self.access.lock().check(principal, AccessKind::Read)?;

        let streams = sealed.record.decode()?;
        Ok(SessionContents {
            samples: streams.samples,
            events: streams.events,
            report: sealed.blob.efficiency_report,
        })
    }

    /// Release buffers and close. A `Failed` session has its buffers
    /// released but stays `Failed`.
    ///
    /// # Errors
    /// `InvalidState` if already closed.
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(self.invalid("close"));
        }
        self.encoder = RecordEncoder::new(self.config.scale_factor, self.config.quantization_buckets);
        self.trail = Vec::new();
        self.sealed = None;
        if self.state == SessionState::Failed {
            info!(session_id = %self.id, "failed session released");
            return Ok(());
        }
        let previous = mem::replace(&mut self.state, SessionState::Closed);
        info!(session_id = %self.id, from = ?previous, "session closed");
        Ok(())
    }

    /// Owner-only discard: checks `Delete` access, then closes. A `Failed`
    /// session stays `Failed`.
    ///
    /// # Errors
    /// `InvalidState` if already closed, `Access(Denied)` for non-owners.
    pub fn delete(&mut self, principal: &Identity) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(self.invalid("delete"));
        }
        self.access.lock().check(principal, AccessKind::Delete)?;
        self.close()
    }

    /// Serialized [`AccessControl`] and its audit checkpoint, for the
    /// ledger writer.
    ///
    /// # Errors
    /// `Access(Snapshot)` if serialization fails.
    pub fn access_snapshot(&self) -> Result<AccessSnapshot> {
        Ok(self.access.lock().snapshot()?)
    }

    /// Gate an access without reading anything. Successful checks are logged.
    ///
    /// # Errors
    /// `Access(Denied)` if `principal` may not perform `kind`.
    pub fn check_access(&self, principal: &Identity, kind: AccessKind) -> Result<()> {
        Ok(self.access.lock().check(principal, kind)?)
    }

    pub fn grant(&self, by: &Identity, principal: impl Into<Identity>, permission: Permission) -> Result<()> {
        Ok(self.access.lock().grant(by, principal.into(), permission)?)
    }

    pub fn revoke(&self, by: &Identity, principal: &Identity) -> Result<bool> {
        Ok(self.access.lock().revoke(by, principal)?)
    }

    pub fn set_public(&self, by: &Identity, public: bool) -> Result<()> {
        Ok(self.access.lock().set_public(by, public)?)
    }

    /// Copy of the audit log entries, oldest first.
    pub fn audit_entries(&self) -> Vec<AccessEntry> {
        self.access.lock().log().entries().to_vec()
    }

    /// Re-check the audit chain and, when sealed, that the stored bytes still
    /// decode to the sealed record.
    ///
    /// # Errors
    /// `Access(TamperedLog)` or a codec error.
    pub fn verify(&self) -> Result<()> {
        self.access.lock().verify()?;
        if let Some(sealed) = &self.sealed {
            let record = SessionRecord::deserialize(&sealed.blob.compressed_bytes)?;
            if record != sealed.record {
                return Err(CodecError::Corrupt("sealed bytes diverge from record".to_string()).into());
            }
            record.decode()?;
        }
        Ok(())
    }

    pub fn stats(&self) -> SessionStats {
        let (samples, events, segments) = match &self.sealed {
            Some(sealed) => (
                sealed.record.header.sample_count,
                sealed.record.header.event_count,
                Some(sealed.record.segments.len()),
            ),
            None => (self.encoder.sample_count(), self.encoder.event_count(), None),
        };
        SessionStats {
            state: self.state,
            samples,
            events,
            segments,
            trail_len: self.trail_len,
            audit_entries: self.access.lock().log().len(),
            prediction_accuracy: self.predictor.accuracy(),
        }
    }

    /// Score the prediction from the previous trail symbol, then extend the
    /// trail.
    fn observe(&mut self, symbol: QuantizedSymbol) {
        if let Some(&previous) = self.trail.last() {
            let prediction = self.predictor.predict(previous);
            self.predictor.record_outcome(prediction.symbol, symbol);
        }
        self.trail.push(symbol);
        self.trail_len += 1;
    }

    /// Validate `config` and check `predictor` was built from it.
    fn prepare(config: &SessionConfig, predictor: &SequencePredictor) -> Result<Quantizer> {
        config.validate()?;
        let expected = config.predictor_config();
        let actual = predictor.config();
        if actual != expected {
            return Err(SessionError::InvalidConfig(format!(
                "predictor has history_capacity {} and prediction_window {}, config wants {} and {}",
                actual.history_capacity,
                actual.prediction_window,
                expected.history_capacity,
                expected.prediction_window
            )));
        }
        Quantizer::new(config.quantization_buckets).map_err(|e| SessionError::InvalidConfig(e.to_string()))
    }

    fn require(&self, expected: SessionState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn sealed_or(&self, operation: &'static str) -> Result<&Sealed> {
        match (&self.state, &self.sealed) {
            (SessionState::Sealed, Some(sealed)) => Ok(sealed),
            _ => Err(self.invalid(operation)),
        }
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidState {
            operation,
            state: self.state,
        }
    }
}

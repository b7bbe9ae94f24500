//! Sealing into a ledger and reading back.

use std::sync::Arc;

use affect_ledger::{
    estimate_cost, AccessSnapshot, Identity, LedgerReader, LedgerWriter, MemoryLedger, SealedBlob,
    SessionError, SessionState, StorageSession,
};
use integration_tests::{
    recorded_session, shared_predictor, synthetic_events, synthetic_samples, test_config,
};

struct FlakyLedger {
    inner: MemoryLedger,
    failures_left: usize,
}

impl LedgerWriter for FlakyLedger {
    fn persist(&mut self, blob: &SealedBlob, access_snapshot: &AccessSnapshot) -> affect_ledger::Result<()> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(SessionError::Ledger("transient write failure".to_string()));
        }
        self.inner.persist(blob, access_snapshot)
    }
}

#[test]
fn test_many_sessions_into_one_ledger() {
    let config = test_config();
    let predictor = shared_predictor(&config);
    let mut ledger = MemoryLedger::new();
    let mut ids = Vec::new();

    for seed in 0..6 {
        let mut session = recorded_session(
            config,
            "owner",
            Arc::clone(&predictor),
            &synthetic_samples(200, seed),
            &synthetic_events(200, seed),
        );
        ids.push(session.seal_into(&mut ledger).unwrap().session_id);
    }

    assert_eq!(ledger.len(), 6);
    let expected_cost = estimate_cost(
        ledger.stored_bytes(),
        config.retention_periods,
        config.cost_per_byte_period,
    );
    assert!((ledger.total_estimated_cost() - expected_cost).abs() < 1e-9);

    for id in ids {
        let session = StorageSession::load(&ledger, id, config, Arc::clone(&predictor)).unwrap();
        let contents = session.read(&Identity::from("owner")).unwrap();
        assert_eq!(contents.samples.len(), 200);
        assert_eq!(contents.events.len(), 200);
    }
}

#[test]
fn test_failed_persist_can_be_retried() {
    let config = test_config();
    let mut ledger = FlakyLedger {
        inner: MemoryLedger::new(),
        failures_left: 1,
    };
    let mut session = recorded_session(
        config,
        "owner",
        shared_predictor(&config),
        &synthetic_samples(100, 4),
        &[],
    );

    let err = session.seal_into(&mut ledger).unwrap_err();
    assert_eq!(err.component(), "ledger");
    assert_eq!(session.state(), SessionState::Sealed);

    let blob = session.sealed_blob().unwrap().clone();
    ledger
        .persist(&blob, &session.access_snapshot().unwrap())
        .unwrap();
    assert!(ledger.inner.contains(blob.session_id));
}

#[test]
fn test_quota_rejection_surfaces_as_ledger_error() {
    let config = test_config();
    let mut ledger = MemoryLedger::new().with_byte_limit(64);
    let mut session = recorded_session(
        config,
        "owner",
        shared_predictor(&config),
        &synthetic_samples(500, 8),
        &[],
    );

    let err = session.seal_into(&mut ledger).unwrap_err();
    assert!(matches!(err, SessionError::Ledger(_)));
    assert!(ledger.is_empty());
    assert!(session.sealed_blob().is_some());
}

#[test]
fn test_reader_config_cannot_rewrite_persisted_report() {
    let config = test_config();
    let predictor = shared_predictor(&config);
    let mut ledger = MemoryLedger::new();
    let mut session = recorded_session(
        config,
        "owner",
        Arc::clone(&predictor),
        &synthetic_samples(300, 12),
        &synthetic_events(300, 12),
    );
    let blob = session.seal_into(&mut ledger).unwrap();

    let reopened = StorageSession::load(&ledger, blob.session_id, config, Arc::clone(&predictor)).unwrap();
    assert_eq!(reopened.report(), Some(&blob.efficiency_report));

    let pricier = config.with_retention_periods(1);
    let err = StorageSession::load(&ledger, blob.session_id, pricier, Arc::clone(&predictor))
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidConfig(_)));

    let coarser = config.with_scale_factor(100.0);
    let err = StorageSession::load(&ledger, blob.session_id, coarser, predictor).unwrap_err();
    assert_eq!(err.component(), "configuration");

    let stored = ledger.load(blob.session_id).unwrap();
    assert_eq!(stored.blob.efficiency_report, blob.efficiency_report);
}

#[test]
fn test_unknown_session_load_fails() {
    let config = test_config();
    let ledger = MemoryLedger::new();
    let err = StorageSession::load(
        &ledger,
        uuid_from_session(&config),
        config,
        shared_predictor(&config),
    )
    .unwrap_err();
    assert_eq!(err.component(), "ledger");
}

fn uuid_from_session(config: &affect_ledger::SessionConfig) -> affect_ledger::Uuid {
    StorageSession::open(*config, "someone", shared_predictor(config))
        .unwrap()
        .id()
}

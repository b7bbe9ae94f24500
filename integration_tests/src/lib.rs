//! Integration test helpers for the affect storage engine.
//!
//! Provides deterministic synthetic streams and session setup shared by the
//! scenarios under `tests/`.

use std::sync::Arc;

use affect_ledger::{Event, Sample, SequencePredictor, SessionConfig, StorageSession};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Install a test-writer subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("affect_ledger=debug,affect_predict=debug")
        .with_test_writer()
        .try_init();
}

/// Session config with a small per-byte cost.
pub fn test_config() -> SessionConfig {
    SessionConfig::new(0.000_01).with_retention_periods(12)
}

pub fn shared_predictor(config: &SessionConfig) -> Arc<SequencePredictor> {
    Arc::new(SequencePredictor::new(config.predictor_config()))
}

/// Bounded random walk in `[-1, 1]`, one sample every 4 ms.
pub fn synthetic_samples(count: usize, seed: u64) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut value: f32 = 0.0;
    (0..count)
        .map(|i| {
            value = (value + rng.gen_range(-0.02..=0.02)).clamp(-1.0, 1.0);
            Sample::new(10_000 + i as u64 * 4, value)
        })
        .collect()
}

/// Low-entropy marker stream: long runs drawn from a handful of symbols.
pub fn synthetic_events(count: usize, seed: u64) -> Vec<Event> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut symbol: u8 = 100;
    (0..count)
        .map(|i| {
            if rng.gen_bool(0.05) {
                symbol = rng.gen_range(95..=105);
            }
            Event::new(10_000 + i as u64 * 16, symbol)
        })
        .collect()
}

/// Open a session and feed it `samples` then `events`.
pub fn recorded_session(
    config: SessionConfig,
    owner: &str,
    predictor: Arc<SequencePredictor>,
    samples: &[Sample],
    events: &[Event],
) -> StorageSession {
    let mut session = StorageSession::open(config, owner, predictor).expect("open failed");
    for sample in samples {
        session.ingest_sample(*sample).expect("ingest sample failed");
    }
    for event in events {
        session.ingest_event(*event).expect("ingest event failed");
    }
    session
}

//! Shared predictor trained by sealed sessions.

use std::sync::Arc;

use affect_compress::Quantizer;
use affect_ledger::{Event, Sample, SequencePredictor, SessionError, StorageSession};
use affect_predict::TrainingSequence;
use integration_tests::{recorded_session, shared_predictor, synthetic_events, test_config};

fn cycle_events(pattern: &[u8], repeats: usize) -> Vec<Event> {
    pattern
        .iter()
        .cycle()
        .take(pattern.len() * repeats)
        .enumerate()
        .map(|(i, &s)| Event::new(i as u64, s))
        .collect()
}

#[test]
fn test_each_seal_adds_one_training_sequence() {
    let config = test_config();
    let predictor = shared_predictor(&config);

    for seed in 0..5 {
        let mut session = recorded_session(
            config,
            "owner",
            Arc::clone(&predictor),
            &[],
            &synthetic_events(200, seed),
        );
        session.seal().unwrap();
    }
    assert_eq!(predictor.history_len(), 5);
    assert_eq!(predictor.generation(), 5);
}

#[test]
fn test_history_evicts_oldest_sessions() {
    let config = test_config().with_history_capacity(2);
    let predictor = shared_predictor(&config);

    for pattern in [[10, 11], [20, 21], [30, 31]] {
        let mut session = recorded_session(
            config,
            "owner",
            Arc::clone(&predictor),
            &[],
            &cycle_events(&pattern, 4),
        );
        session.seal().unwrap();
    }

    assert_eq!(predictor.history_len(), 2);
    assert!(predictor.predict(10).cold_start);
    assert_eq!(predictor.predict(20).symbol, 21);
    assert_eq!(predictor.predict(30).symbol, 31);
}

#[test]
fn test_session_rejects_predictor_with_other_settings() {
    let config = test_config().with_history_capacity(1);
    let err = StorageSession::open(config, "owner", Arc::new(SequencePredictor::default())).unwrap_err();
    assert!(matches!(err, SessionError::InvalidConfig(_)));

    let predictor = shared_predictor(&config);
    for seed in 0..3 {
        let mut session = recorded_session(
            config,
            "owner",
            Arc::clone(&predictor),
            &[],
            &synthetic_events(50, seed),
        );
        session.seal().unwrap();
    }
    assert_eq!(predictor.history_len(), 1);
}

#[test]
fn test_repeated_symbol_predicts_itself() {
    let config = test_config();
    let predictor = shared_predictor(&config);
    let mut session = recorded_session(config, "owner", Arc::clone(&predictor), &[], &cycle_events(&[42], 50));
    session.seal().unwrap();

    let prediction = predictor.predict(42);
    assert_eq!(prediction.symbol, 42);
    assert_eq!(prediction.confidence, 1.0);
    assert!(!prediction.cold_start);
}

#[test]
fn test_accuracy_improves_once_trained() {
    let config = test_config().with_prediction_window(50);
    let predictor = shared_predictor(&config);
    let pattern = [1, 2, 3, 4];

    // Untrained: cold start predicts the current symbol, which never repeats.
    let mut first = recorded_session(config, "owner", Arc::clone(&predictor), &[], &cycle_events(&pattern, 20));
    assert_eq!(predictor.accuracy(), Some(0.0));
    first.seal().unwrap();

    let mut second = recorded_session(config, "owner", Arc::clone(&predictor), &[], &cycle_events(&pattern, 20));
    assert_eq!(predictor.accuracy(), Some(1.0));
    second.seal().unwrap();
    assert_eq!(second.stats().prediction_accuracy, Some(1.0));
}

#[test]
fn test_sample_trail_uses_quantized_buckets() {
    let config = test_config();
    let predictor = shared_predictor(&config);
    let values = [0.0, 0.5, 0.0, 0.5, 0.0];
    let samples: Vec<Sample> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| Sample::new(i as u64, v))
        .collect();

    let mut session = StorageSession::open(config, "owner", Arc::clone(&predictor)).unwrap();
    for sample in samples {
        session.ingest_sample(sample).unwrap();
    }
    session.seal().unwrap();

    let quantizer = Quantizer::new(config.quantization_buckets).unwrap();
    let zero = quantizer.quantize(0.0);
    let half = quantizer.quantize(0.5);
    assert_eq!(predictor.predict(zero).symbol, half);
    assert_eq!(predictor.predict(half).symbol, zero);
    assert_eq!(
        predictor.history_snapshot(),
        vec![TrainingSequence::new(vec![zero, half, zero, half, zero])]
    );
}

#[test]
fn test_predictor_shared_across_threads() {
    let config = test_config();
    let predictor: Arc<SequencePredictor> = shared_predictor(&config);

    let handles: Vec<_> = (0..4u64)
        .map(|seed| {
            let predictor = Arc::clone(&predictor);
            std::thread::spawn(move || {
                let mut session =
                    recorded_session(config, "owner", predictor, &[], &synthetic_events(500, seed));
                session.seal().unwrap()
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(predictor.history_len(), 4);
    assert_eq!(predictor.generation(), 4);
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Arbitrary ingest sequences either seal into a blob that reopens to the
//! same contents, or fail the session cleanly.

#![no_main]

use std::sync::Arc;

use affect_ledger::{
    AccessControl, Event, Identity, Sample, SequencePredictor, SessionConfig, SessionState,
    StorageSession,
};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Input {
    Sample { timestamp: u64, value: f32 },
    Event { timestamp: u64, symbol: u8 },
}

fuzz_target!(|inputs: Vec<Input>| {
    let config = SessionConfig::new(0.001);
    let predictor = Arc::new(SequencePredictor::new(config.predictor_config()));
    let mut session = StorageSession::open(config, "owner", Arc::clone(&predictor)).expect("open");

    for input in inputs.iter().take(512) {
        let result = match *input {
            Input::Sample { timestamp, value } => session.ingest_sample(Sample::new(timestamp, value)),
            Input::Event { timestamp, symbol } => session.ingest_event(Event::new(timestamp, symbol)),
        };
        if result.is_err() {
            assert_eq!(session.state(), SessionState::Failed);
            return;
        }
    }

    let blob = session.seal().expect("seal");
    let owner = Identity::from("owner");
    let contents = session.read(&owner).expect("read");

    let access = AccessControl::restore(&session.access_snapshot().expect("snapshot"), None)
        .expect("restore access");
    let reopened =
        StorageSession::reopen(blob.session_id, &blob.compressed_bytes, access, config, predictor)
            .expect("reopen");
    assert_eq!(reopened.report(), Some(&blob.efficiency_report));
    assert_eq!(reopened.read(&owner).expect("reread"), contents);
});

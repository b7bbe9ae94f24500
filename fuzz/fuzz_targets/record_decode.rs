// SPDX-License-Identifier: MIT OR Apache-2.0
#![no_main]

use affect_compress::SessionRecord;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1 << 16 {
        return;
    }
    if let Ok(record) = SessionRecord::deserialize(data) {
        if let Ok(streams) = record.decode() {
            assert_eq!(streams.samples.len() as u64, record.header.sample_count);
            assert_eq!(streams.events.len() as u64, record.header.event_count);
        }
    }
});

#![no_main]

use demora::category::CategoryId;
use demora::session::{ProfileSession, SessionConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let session = ProfileSession::new(SessionConfig::default());

    // Each 10-byte chunk drives one operation: category selector, raw
    // signed start and duration, and a control byte.
    for chunk in data.chunks_exact(10) {
        let category = CategoryId::ALL[chunk[0] as usize % CategoryId::COUNT];
        let start =
            i64::from(i32::from_le_bytes([chunk[1], chunk[2], chunk[3], chunk[4]]));
        let duration =
            i64::from(i32::from_le_bytes([chunk[5], chunk[6], chunk[7], chunk[8]]));

        // Negative raw times must come back as errors, never panics.
        let _ = session.record_raw(category, start, duration, "/fuzz");

        if chunk[9] & 0x80 != 0 {
            session.reset();
        }
        if chunk[9] & 0x40 != 0 {
            let snapshot = session.slowest(category);
            assert!(snapshot.len() <= 30);
            for (index, record) in snapshot.iter().enumerate() {
                assert_eq!(record.rank, index + 1);
            }
        }
    }

    // Whatever the input, retention bounds and summary construction hold.
    for category in CategoryId::ALL {
        assert!(session.slowest(category).len() <= 30);
    }
    let _ = session.summary();
});

//! Fuzz target: `FailureLog` ring buffer
//!
//! Drives arbitrary record sequences with arbitrary detail text (including
//! multi-byte UTF-8 cut at any length) and a corrupted slot.  Verifies:
//! - No panics
//! - `read_all` never returns more than `FAILURE_RING_SLOTS` entries
//! - `clear` empties the ring
//!
//! cargo fuzz run fuzz_failure_log

#![no_main]

use libfuzzer_sys::fuzz_target;
use zonewatch::adapters::kv::KvAdapter;
use zonewatch::app::ports::StoragePort;
use zonewatch::diagnostics::{FAILURE_RING_SLOTS, FailureEntry, FailureLog};
use zonewatch::error::FailureKind;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let mut kv = KvAdapter::new();
    let mut log = FailureLog::new();
    log.init(&kv);

    let detail = String::from_utf8_lossy(&data[1..]);
    let writes = (data[0] as usize % 20) + 1;
    for i in 0..writes {
        let kind = match data[0] % 4 {
            0 => FailureKind::PermissionDenied,
            1 => FailureKind::Persistence,
            2 => FailureKind::Panicked,
            _ => FailureKind::HostTimeout,
        };
        let entry = FailureEntry::new(i as u64, kind, Some(i as i64), &detail);
        assert!(entry.detail.len() <= 64);
        log.record(&mut kv, &entry);
    }

    // Garbage in one slot is skipped, never decoded into an entry.
    let _ = kv.write("diag", "f0", data);

    let entries = log.read_all(&kv);
    assert!(entries.len() <= FAILURE_RING_SLOTS);

    log.clear(&mut kv);
    assert!(log.read_all(&kv).is_empty());
});

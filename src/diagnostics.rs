//! Cycle-failure logging and runtime metrics.
//!
//! Background cycles have no caller to return an error to, so every
//! failed cycle is written to a small ring buffer under the `"diag"`
//! namespace of a [`StoragePort`].  Each entry captures the wall-clock
//! time, the failure kind, the affected zone (if any) and a truncated
//! message.
//!
//! Runtime metrics are plain atomic counters, snapshotted on demand.

use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::ports::StoragePort;
use crate::error::{CycleError, FailureKind};
use crate::zone::ZoneId;

pub const FAILURE_RING_SLOTS: usize = 8;
const DIAG_NAMESPACE: &str = "diag";
const DIAG_INDEX_KEY: &str = "fail_idx";
const DETAIL_CAPACITY: usize = 64;
const ENTRY_BUF_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    /// Epoch seconds.
    pub at: u64,
    pub kind: FailureKind,
    pub zone_id: Option<ZoneId>,
    pub detail: heapless::String<DETAIL_CAPACITY>,
}

impl FailureEntry {
    pub fn new(at: u64, kind: FailureKind, zone_id: Option<ZoneId>, detail: &str) -> Self {
        let mut d = heapless::String::new();
        let _ = d.push_str(truncate_on_char_boundary(detail, DETAIL_CAPACITY));
        Self {
            at,
            kind,
            zone_id,
            detail: d,
        }
    }

    pub fn from_error(at: u64, err: &CycleError) -> Self {
        let zone_id = match err {
            CycleError::Persistence { zone_id, .. } => Some(*zone_id),
            _ => None,
        };
        Self::new(at, err.kind(), zone_id, &err.to_string())
    }
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Storage-backed ring buffer of failure entries.
#[derive(Default)]
pub struct FailureLog {
    write_index: usize,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the write index from storage, or start at 0.
    pub fn init(&mut self, storage: &dyn StoragePort) {
        let mut buf = [0u8; 4];
        if let Ok(4) = storage.read(DIAG_NAMESPACE, DIAG_INDEX_KEY, &mut buf) {
            self.write_index = u32::from_le_bytes(buf) as usize % FAILURE_RING_SLOTS;
        }
    }

    /// Write an entry to the next slot and advance the index.  Storage
    /// errors are logged; a failure log must never fail the cycle.
    pub fn record(&mut self, storage: &mut dyn StoragePort, entry: &FailureEntry) {
        let slot_key = Self::slot_key(self.write_index);
        match postcard::to_allocvec(entry) {
            Ok(bytes) => {
                if let Err(e) = storage.write(DIAG_NAMESPACE, &slot_key, &bytes) {
                    warn!("Diagnostics: failure entry not persisted: {}", e);
                }
            }
            Err(_) => warn!("Diagnostics: failure entry not encodable"),
        }

        self.write_index = (self.write_index + 1) % FAILURE_RING_SLOTS;
        let idx_bytes = (self.write_index as u32).to_le_bytes();
        let _ = storage.write(DIAG_NAMESPACE, DIAG_INDEX_KEY, &idx_bytes);
    }

    /// Stored entries, oldest first.  Undecodable slots are skipped.
    pub fn read_all(&self, storage: &dyn StoragePort) -> heapless::Vec<FailureEntry, FAILURE_RING_SLOTS> {
        let mut entries = heapless::Vec::new();
        for offset in 0..FAILURE_RING_SLOTS {
            let slot_key = Self::slot_key((self.write_index + offset) % FAILURE_RING_SLOTS);
            let mut buf = [0u8; ENTRY_BUF_LEN];
            if let Ok(len) = storage.read(DIAG_NAMESPACE, &slot_key, &mut buf) {
                if let Ok(entry) = postcard::from_bytes::<FailureEntry>(&buf[..len]) {
                    let _ = entries.push(entry);
                }
            }
        }
        entries
    }

    pub fn clear(&mut self, storage: &mut dyn StoragePort) {
        for i in 0..FAILURE_RING_SLOTS {
            let _ = storage.delete(DIAG_NAMESPACE, &Self::slot_key(i));
        }
        let _ = storage.delete(DIAG_NAMESPACE, DIAG_INDEX_KEY);
        self.write_index = 0;
    }

    pub fn count(&self, storage: &dyn StoragePort) -> usize {
        (0..FAILURE_RING_SLOTS)
            .filter(|i| storage.exists(DIAG_NAMESPACE, &Self::slot_key(*i)))
            .count()
    }

    fn slot_key(index: usize) -> heapless::String<16> {
        let mut s = heapless::String::new();
        let _ = core::fmt::Write::write_fmt(&mut s, format_args!("f{}", index));
        s
    }
}

/// Live counters owned by the check service.
#[derive(Debug, Default)]
pub struct CycleCounters {
    cycles_run: AtomicU64,
    cycles_failed: AtomicU64,
    no_fix_cycles: AtomicU64,
    overlaps_skipped: AtomicU64,
    triggers: AtomicU64,
}

impl CycleCounters {
    pub fn cycle_run(&self) {
        self.cycles_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cycle_failed(&self) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn no_fix(&self) {
        self.no_fix_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn overlap_skipped(&self) {
        self.overlaps_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn triggered(&self, n: usize) {
        self.triggers.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RuntimeMetrics {
        RuntimeMetrics {
            cycles_run: self.cycles_run.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            no_fix_cycles: self.no_fix_cycles.load(Ordering::Relaxed),
            overlaps_skipped: self.overlaps_skipped.load(Ordering::Relaxed),
            triggers: self.triggers.load(Ordering::Relaxed),
        }
    }
}

/// Runtime diagnostics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeMetrics {
    pub cycles_run: u64,
    pub cycles_failed: u64,
    pub no_fix_cycles: u64,
    pub overlaps_skipped: u64,
    pub triggers: u64,
}

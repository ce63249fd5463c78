//! Proximity state store adapters.
//!
//! - [`MemoryProximityStore`]: process-local map, used by tests and the
//!   simulation binary.  Supports write fault injection.
//! - [`KvProximityStore`]: persists one postcard-encoded record per zone
//!   through any [`StoragePort`], namespace `"prox"`, key = decimal id.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::warn;

use crate::app::ports::{ProximityStateStore, StorageError, StoragePort};
use crate::error::StateStoreError;
use crate::proximity::ProximityState;
use crate::zone::ZoneId;

// ───────────────────────────────────────────────────────────────
// In-memory
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryProximityStore {
    records: Mutex<HashMap<ZoneId, ProximityState>>,
    fail_writes: AtomicBool,
}

impl MemoryProximityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, `put` and `remove` fail with a backend I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Ordered copy of every record.
    pub fn snapshot(&self) -> BTreeMap<ZoneId, ProximityState> {
        self.lock().iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ZoneId, ProximityState>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> Result<(), StateStoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StateStoreError::Storage(StorageError::IoError))
        } else {
            Ok(())
        }
    }
}

impl ProximityStateStore for MemoryProximityStore {
    fn get(&self, zone_id: ZoneId) -> Result<Option<ProximityState>, StateStoreError> {
        Ok(self.lock().get(&zone_id).copied())
    }

    fn put(&self, state: &ProximityState) -> Result<(), StateStoreError> {
        self.check_writable()?;
        self.lock().insert(state.zone_id, *state);
        Ok(())
    }

    fn remove(&self, zone_id: ZoneId) -> Result<(), StateStoreError> {
        self.check_writable()?;
        self.lock().remove(&zone_id);
        Ok(())
    }

    fn zone_ids(&self) -> Result<Vec<ZoneId>, StateStoreError> {
        let mut ids: Vec<_> = self.lock().keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

// ───────────────────────────────────────────────────────────────
// Key-value backed
// ───────────────────────────────────────────────────────────────

pub const PROXIMITY_NAMESPACE: &str = "prox";

/// Encoded records are a few bytes; anything filling this is not ours.
const RECORD_BUF_LEN: usize = 64;

pub struct KvProximityStore<S: StoragePort + Send> {
    storage: Arc<Mutex<S>>,
}

impl<S: StoragePort + Send> KvProximityStore<S> {
    pub fn new(storage: Arc<Mutex<S>>) -> Self {
        Self { storage }
    }

    fn key(zone_id: ZoneId) -> String {
        zone_id.to_string()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, S> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: StoragePort + Send> ProximityStateStore for KvProximityStore<S> {
    fn get(&self, zone_id: ZoneId) -> Result<Option<ProximityState>, StateStoreError> {
        let mut buf = [0u8; RECORD_BUF_LEN];
        let len = match self.lock().read(PROXIMITY_NAMESPACE, &Self::key(zone_id), &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state: ProximityState =
            postcard::from_bytes(&buf[..len]).map_err(|_| StateStoreError::Corrupt(zone_id))?;
        if state.zone_id != zone_id {
            return Err(StateStoreError::Corrupt(zone_id));
        }
        Ok(Some(state))
    }

    fn put(&self, state: &ProximityState) -> Result<(), StateStoreError> {
        let bytes = postcard::to_allocvec(state).map_err(|_| StateStoreError::Encode)?;
        self.lock()
            .write(PROXIMITY_NAMESPACE, &Self::key(state.zone_id), &bytes)?;
        Ok(())
    }

    fn remove(&self, zone_id: ZoneId) -> Result<(), StateStoreError> {
        self.lock().delete(PROXIMITY_NAMESPACE, &Self::key(zone_id))?;
        Ok(())
    }

    fn zone_ids(&self) -> Result<Vec<ZoneId>, StateStoreError> {
        let mut ids = Vec::new();
        for key in self.lock().keys(PROXIMITY_NAMESPACE) {
            match key.parse::<ZoneId>() {
                Ok(id) => ids.push(id),
                Err(_) => warn!("KvAdapter: ignoring foreign key '{}' in '{}'", key, PROXIMITY_NAMESPACE),
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

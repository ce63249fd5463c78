//! Fuzz target: stored proximity records
//!
//! Plants arbitrary bytes as a zone's record in the key-value store and
//! runs a check against it.  Verifies:
//! - Decoding never panics; garbage surfaces as `Corrupt`
//! - After evaluation the record is always valid and current
//!
//! cargo fuzz run fuzz_proximity_record

#![no_main]

use std::sync::{Arc, Mutex};

use libfuzzer_sys::fuzz_target;
use zonewatch::adapters::kv::KvAdapter;
use zonewatch::adapters::proximity_store::{KvProximityStore, PROXIMITY_NAMESPACE};
use zonewatch::app::ports::{ProximityStateStore, StoragePort};
use zonewatch::error::StateStoreError;
use zonewatch::geo::Position;
use zonewatch::proximity::ProximityEngine;
use zonewatch::zone::Zone;

fuzz_target!(|data: &[u8]| {
    let kv = Arc::new(Mutex::new(KvAdapter::new()));
    kv.lock().unwrap().write(PROXIMITY_NAMESPACE, "1", data).unwrap();
    let store = Arc::new(KvProximityStore::new(kv));

    match store.get(1) {
        Ok(Some(rec)) => assert_eq!(rec.zone_id, 1),
        Ok(None) => unreachable!("key was written"),
        Err(e) => assert_eq!(e, StateStoreError::Corrupt(1)),
    }

    let centre = Position::new(47.3769, 8.5417).unwrap();
    let engine = ProximityEngine::new(store.clone());
    let eval = engine.evaluate(Some(&centre), &[Zone::new(1, centre)], 200, 7);
    assert!(eval.is_clean());

    let rec = store.get(1).unwrap().unwrap();
    assert!(rec.is_inside);
    assert_eq!(rec.last_checked, 7);
});

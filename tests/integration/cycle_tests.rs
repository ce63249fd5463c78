//! Check cycles end to end through the key-value backed state store.

use std::sync::Arc;

use zonewatch::adapters::proximity_store::KvProximityStore;
use zonewatch::app::events::AppEvent;
use zonewatch::app::ports::{ProximityStateStore, StoragePort};
use zonewatch::app::service::{CheckPorts, CheckService, CycleOutcome};
use zonewatch::error::{CycleError, FailureKind, StateStoreError};
use zonewatch::proximity::ProximityState;
use zonewatch::zone::{ActiveWindow, WeekdaySet, Zone};

use crate::mock_ports::{Harness, MONDAY_0830, five_km_north, zurich};

#[test]
fn zurich_walk() {
    let h = Harness::new(300);

    assert_eq!(
        h.service.run_cycle(),
        CycleOutcome::Completed {
            checked: 1,
            triggered: 1
        }
    );
    assert_eq!(
        h.service.run_cycle(),
        CycleOutcome::Completed {
            checked: 1,
            triggered: 0
        }
    );

    h.location.set(Some(five_km_north()));
    h.clock.advance_secs(300);
    h.service.run_cycle();
    assert_eq!(
        h.store.get(1).unwrap(),
        Some(ProximityState {
            zone_id: 1,
            is_inside: false,
            last_checked: MONDAY_0830 + 300,
        })
    );

    h.location.set(Some(zurich()));
    h.service.run_cycle();
    assert_eq!(h.actions.entered(), vec![1, 1]);

    let entered: Vec<_> = h
        .events
        .all()
        .into_iter()
        .filter_map(|e| match e {
            AppEvent::ZoneEntered {
                zone_id,
                name,
                distance_m,
            } => Some((zone_id, name, distance_m)),
            _ => None,
        })
        .collect();
    assert_eq!(entered.len(), 2);
    assert_eq!(entered[0].1.as_deref(), Some("Zurich HB"));
    assert_eq!(entered[0].2, 0.0);
}

#[test]
fn state_survives_service_restart() {
    let h = Harness::new(300);
    h.service.run_cycle();
    assert_eq!(h.actions.entered(), vec![1]);

    let ports = CheckPorts {
        zones: h.zones.clone(),
        settings: h.settings.clone(),
        location: h.location.clone(),
        permission: h.permission.clone(),
        actions: h.actions.clone(),
        clock: h.clock.clone(),
        events: h.events.clone(),
    };
    let restarted = CheckService::new(ports, Arc::new(KvProximityStore::new(h.kv.clone())));
    assert_eq!(
        restarted.run_cycle(),
        CycleOutcome::Completed {
            checked: 1,
            triggered: 0
        }
    );
    assert_eq!(h.actions.entered(), vec![1]);
}

#[test]
fn storage_failure_is_recorded_and_withheld() {
    let h = Harness::new(300);
    h.kv.lock().unwrap().set_fail_writes(true);

    let outcome = h.service.run_cycle();
    assert!(matches!(
        outcome,
        CycleOutcome::Failed(CycleError::Persistence {
            zone_id: 1,
            source: StateStoreError::Storage(_)
        })
    ));
    assert!(h.actions.entered().is_empty());
    // The failure log shares the broken backend; nothing lands there.
    assert!(h.service.failure_entries().is_empty());
    assert_eq!(h.service.metrics().cycles_failed, 1);

    h.kv.lock().unwrap().set_fail_writes(false);
    h.service.run_cycle();
    assert_eq!(h.actions.entered(), vec![1]);
}

#[test]
fn corrupt_record_reads_as_unseen() {
    let h = Harness::new(300);
    h.kv
        .lock()
        .unwrap()
        .write("prox", "1", &[0xFF, 0xFF, 0xFF])
        .unwrap();
    assert_eq!(h.store.get(1), Err(StateStoreError::Corrupt(1)));

    h.service.run_cycle();
    assert_eq!(h.actions.entered(), vec![1], "inside + unseen fires");
    assert_eq!(h.is_inside(1), Some(true), "record repaired");
}

#[test]
fn gated_zones_keep_their_state() {
    let h = Harness::new(300);
    h.zones.upsert(
        Zone::new(2, zurich())
            .with_name("night")
            .with_window(ActiveWindow::from_hm((22, 0), (2, 0)).unwrap()),
    );
    h.zones.upsert(
        Zone::new(3, zurich())
            .with_name("weekend")
            .with_days(WeekdaySet::WEEKEND),
    );

    h.service.run_cycle();
    assert_eq!(h.actions.entered(), vec![1]);
    assert_eq!(h.is_inside(2), None);
    assert_eq!(h.is_inside(3), None);

    // Monday 23:00 (+14h30): the night zone opens.
    h.clock.advance_secs(14 * 3600 + 1800);
    h.service.run_cycle();
    assert_eq!(h.actions.entered(), vec![1, 2]);
}

#[test]
fn wrapping_window_tail_after_midnight() {
    let h = Harness::new(300);
    h.zones.remove(1);
    h.zones.upsert(
        Zone::new(5, zurich()).with_window(ActiveWindow::from_hm((22, 0), (2, 0)).unwrap()),
    );
    // Tuesday 01:15 (+16h45)
    h.clock.advance_secs(16 * 3600 + 45 * 60);
    h.service.run_cycle();
    assert_eq!(h.actions.entered(), vec![5]);
}

#[test]
fn unknown_clock_evaluates_every_zone() {
    let h = Harness::new(300);
    h.zones.upsert(Zone::new(2, zurich()).with_days(WeekdaySet::empty()));
    h.clock.set_wall_clock_known(false);
    h.service.run_cycle();
    assert_eq!(h.actions.entered(), vec![1, 2]);
}

#[test]
fn orphaned_state_is_pruned_at_cycle_start() {
    let h = Harness::new(300);
    h.zones.upsert(Zone::new(2, five_km_north()));
    h.service.run_cycle();
    assert_eq!(h.store.zone_ids().unwrap(), vec![1, 2]);

    h.zones.remove(2);
    h.service.run_cycle();
    assert_eq!(h.store.zone_ids().unwrap(), vec![1]);
}

#[test]
fn failure_log_keeps_zone_and_time() {
    let h = Harness::new(300);
    h.permission.set_granted(false);
    h.service.run_cycle();
    let entries = h.service.failure_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, FailureKind::PermissionDenied);
    assert_eq!(entries[0].at, MONDAY_0830);
    assert_eq!(entries[0].zone_id, None);
}

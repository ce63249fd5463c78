//! Adaptive scheduler against the virtual-time host.

use std::sync::Arc;
use std::time::Duration;

use zonewatch::adapters::manual_host::ManualHost;
use zonewatch::app::commands::AppCommand;
use zonewatch::app::events::{AppEvent, SkipReason};
use zonewatch::app::ports::WorkHost;
use zonewatch::error::{CycleError, FailureKind};
use zonewatch::scheduler::{CHECK_TASK_SLOT, ScheduleMode};

use crate::mock_ports::{Harness, five_km_north, zurich};

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

#[test]
fn mode_selection_at_the_boundary() {
    for (interval, expected) in [
        (600, ScheduleMode::OneShot { delay: secs(600) }),
        (900, ScheduleMode::Periodic { interval: secs(900) }),
        (1200, ScheduleMode::Periodic { interval: secs(1200) }),
    ] {
        let h = Harness::new(interval);
        h.scheduler.schedule_checks(interval);
        assert_eq!(h.host.scheduled(CHECK_TASK_SLOT), Some(expected), "interval {interval}");
    }
}

#[test]
fn reschedule_leaves_exactly_one_job() {
    let h = Harness::new(1200);
    h.scheduler.handle_command(AppCommand::ScheduleChecks(600));
    h.scheduler.handle_command(AppCommand::ScheduleChecks(1200));
    assert_eq!(h.host.pending(), 1);
    assert_eq!(
        h.host.scheduled(CHECK_TASK_SLOT),
        Some(ScheduleMode::Periodic { interval: secs(1200) })
    );
    assert_eq!(h.advance_secs(3600), 3, "periodic at 1200, 2400, 3600");
    assert_eq!(h.actions.entered(), vec![1], "one entry, no duplicates");
}

#[test]
fn short_mode_follows_interval_changes() {
    let h = Harness::new(300);
    h.scheduler.schedule_checks(300);
    assert_eq!(h.advance_secs(300), 1);

    h.settings.set_check_interval(120).unwrap();
    // Old delay still pending from the re-arm that already happened.
    assert_eq!(h.advance_secs(300), 1);
    assert_eq!(
        h.host.scheduled(CHECK_TASK_SLOT),
        Some(ScheduleMode::OneShot { delay: secs(120) })
    );
    assert_eq!(h.advance_secs(240), 2);
}

#[test]
fn shortening_a_periodic_schedule_switches_mode() {
    let h = Harness::new(1800);
    h.scheduler.schedule_checks(1800);
    h.settings.set_check_interval(600).unwrap();
    h.advance_secs(1800);
    assert_eq!(
        h.host.scheduled(CHECK_TASK_SLOT),
        Some(ScheduleMode::OneShot { delay: secs(600) })
    );
    assert_eq!(h.host.pending(), 1);
}

#[test]
fn no_fix_reschedules_without_failing() {
    let h = Harness::new(300);
    h.location.set(None);
    h.scheduler.schedule_checks(300);
    assert_eq!(h.advance_secs(900), 3);
    assert!(h.host.scheduled(CHECK_TASK_SLOT).is_some());
    assert_eq!(h.service.metrics().no_fix_cycles, 3);
    assert_eq!(h.service.metrics().cycles_failed, 0);
    assert_eq!(
        h.events
            .count(|e| matches!(e, AppEvent::CycleSkipped(SkipReason::NoFix))),
        3
    );
    assert_eq!(h.is_inside(1), None, "nothing written without a fix");
}

#[test]
fn permission_loss_stops_one_shot_without_retry_storm() {
    let h = Harness::new(300);
    h.scheduler.schedule_checks(300);
    h.permission.set_granted(false);
    assert_eq!(h.advance_secs(3600), 1, "one failed cycle, then nothing");
    assert!(h.host.scheduled(CHECK_TASK_SLOT).is_none());

    let failures = h.service.failure_entries();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::PermissionDenied);
    assert!(
        h.events
            .all()
            .contains(&AppEvent::CycleFailed(CycleError::PermissionDenied))
    );
    assert!(h.events.all().contains(&AppEvent::ScheduleCancelled));

    // Granting again does nothing until the UI re-schedules.
    h.permission.set_granted(true);
    assert_eq!(h.advance_secs(3600), 0);
    h.scheduler.schedule_checks(300);
    assert_eq!(h.advance_secs(300), 1);
    assert_eq!(h.actions.entered(), vec![1]);
}

#[test]
fn permission_loss_keeps_periodic_schedule() {
    let h = Harness::new(900);
    h.scheduler.schedule_checks(900);
    h.permission.set_granted(false);
    assert_eq!(h.advance_secs(900), 1);
    assert_eq!(
        h.host.scheduled(CHECK_TASK_SLOT),
        Some(ScheduleMode::Periodic { interval: secs(900) })
    );
    assert_eq!(h.service.failure_entries().len(), 1);
    assert!(h.actions.entered().is_empty());

    // Granted out of band: the running job picks it up.
    h.permission.set_granted(true);
    assert_eq!(h.advance_secs(2700), 3);
    assert_eq!(h.actions.entered(), vec![1]);
    assert!(!h.events.all().contains(&AppEvent::ScheduleCancelled));
}

#[test]
fn disabling_tracking_mid_schedule_stops_rearm() {
    let h = Harness::new(300);
    h.scheduler.schedule_checks(300);
    assert_eq!(h.advance_secs(300), 1);
    h.settings.set_tracking_enabled(false);
    assert_eq!(h.advance_secs(300), 1);
    assert_eq!(h.advance_secs(3600), 0);
    assert!(h.scheduler.active_mode().is_none());
    assert!(
        h.events
            .all()
            .contains(&AppEvent::CycleSkipped(SkipReason::TrackingDisabled))
    );
}

#[test]
fn cancel_prevents_future_cycles() {
    let h = Harness::new(300);
    h.scheduler.schedule_checks(300);
    h.scheduler.handle_command(AppCommand::CancelChecks);
    assert_eq!(h.advance_secs(3600), 0);
    assert_eq!(h.service.metrics().cycles_run, 0);
}

#[test]
fn cancel_during_a_running_cycle_does_not_rearm() {
    for interval in [300, 900] {
        let h = Harness::new(interval);
        let scheduler = Arc::downgrade(&h.scheduler);
        let _ = h.actions.on_enter.set(Box::new(move || {
            if let Some(s) = scheduler.upgrade() {
                s.cancel_checks();
            }
        }));
        h.scheduler.schedule_checks(interval);

        assert_eq!(h.advance_secs(u64::from(interval)), 1);
        assert_eq!(h.actions.entered(), vec![1], "running cycle finished");
        assert!(h.host.scheduled(CHECK_TASK_SLOT).is_none(), "interval {interval}");
        assert!(h.scheduler.active_mode().is_none());
        assert_eq!(h.advance_secs(3600), 0);
        assert_eq!(h.service.metrics().cycles_run, 1);
    }
}

#[test]
fn host_time_limit_is_a_non_fatal_failure() {
    let host = ManualHost::new(secs(900)).with_max_execution_time(Duration::from_millis(10));
    let h = Harness::with_host(300, host);
    *h.actions.delay.lock().unwrap() = Some(Duration::from_millis(50));
    h.scheduler.schedule_checks(300);

    assert_eq!(h.advance_secs(300), 1);
    let failures = h.service.failure_entries();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::HostTimeout);
    assert_eq!(h.service.metrics().cycles_failed, 1);
    assert!(h.host.scheduled(CHECK_TASK_SLOT).is_some(), "still re-armed");

    // Inside and silent now: quick cycles, no further timeouts.
    assert_eq!(h.advance_secs(300), 1);
    assert_eq!(h.service.failure_entries().len(), 1);
}

#[test]
fn zone_deleted_command_drops_state() {
    let h = Harness::new(300);
    h.scheduler.handle_command(AppCommand::RunNow);
    assert_eq!(h.is_inside(1), Some(true));
    h.zones.remove(1);
    h.scheduler.handle_command(AppCommand::ZoneDeleted(1));
    assert_eq!(h.is_inside(1), None);
}

#[test]
fn walk_out_and_back_in_on_a_schedule() {
    let h = Harness::new(300);
    h.scheduler.schedule_checks(300);
    h.advance_secs(300);
    h.location.set(Some(five_km_north()));
    h.advance_secs(300);
    assert_eq!(h.is_inside(1), Some(false));
    h.location.set(Some(zurich()));
    h.advance_secs(300);
    assert_eq!(h.actions.entered(), vec![1, 1]);
    assert_eq!(h.service.metrics().triggers, 2);
}

//! Check service: one geofence check, end to end.
//!
//! [`CheckService`] owns the proximity engine and the failure log.  It
//! has no notion of time or cadence; the
//! [`AdaptiveScheduler`](crate::scheduler::AdaptiveScheduler) decides when
//! a cycle runs and whether another one follows.
//!
//! ```text
//!  PermissionPort ─┐
//!  SettingsPort ───┤   ┌──────────────────────┐ ──▶ ActionSink
//!  ZoneStore ──────┼──▶│     CheckService     │ ──▶ EventSink
//!  LocationSource ─┤   │  gate · engine · log │ ──▶ StoragePort ("diag")
//!  ClockPort ──────┘   └──────────────────────┘
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};

use crate::diagnostics::{CycleCounters, FailureEntry, FailureLog, RuntimeMetrics};
use crate::error::{CycleError, StateStoreError};
use crate::proximity::ProximityEngine;
use crate::scheduler::ScheduleMode;
use crate::zone::{Zone, ZoneId};

use super::events::{AppEvent, SkipReason};
use super::ports::{
    ActionSink, ClockPort, EventSink, LocationSource, PermissionPort, ProximityStateStore,
    SettingsPort, StoragePort, ZoneStore,
};

/// Key-value backend shared with the failure log.
pub type DiagnosticsStorage = Arc<Mutex<dyn StoragePort + Send>>;

/// Everything a cycle talks to.
#[derive(Clone)]
pub struct CheckPorts {
    pub zones: Arc<dyn ZoneStore>,
    pub settings: Arc<dyn SettingsPort>,
    pub location: Arc<dyn LocationSource>,
    pub permission: Arc<dyn PermissionPort>,
    pub actions: Arc<dyn ActionSink>,
    pub clock: Arc<dyn ClockPort>,
    pub events: Arc<dyn EventSink>,
}

/// How a single cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Evaluated `checked` active zones; `triggered` actions fired.
    Completed { checked: usize, triggered: usize },
    /// The location source had no fix; state untouched.
    NoFix,
    /// Tracking is switched off.
    TrackingDisabled,
    /// Another cycle was still running.
    Overlapping,
    Failed(CycleError),
}

impl CycleOutcome {
    /// Whether a schedule running in `mode` ends after this outcome.
    ///
    /// Permission loss ends a one-shot chain.  A periodic job already
    /// fires no faster than the configured interval, so it keeps running
    /// and checks resume once permission is granted again.
    pub fn stops_schedule(&self, mode: &ScheduleMode) -> bool {
        match self {
            Self::TrackingDisabled => true,
            Self::Failed(CycleError::PermissionDenied) => !mode.is_periodic(),
            _ => false,
        }
    }
}

pub struct CheckService {
    ports: CheckPorts,
    engine: ProximityEngine,
    diagnostics: Option<DiagnosticsStorage>,
    failure_log: Mutex<FailureLog>,
    in_flight: AtomicBool,
    counters: CycleCounters,
}

impl CheckService {
    pub fn new(ports: CheckPorts, store: Arc<dyn ProximityStateStore>) -> Self {
        Self {
            ports,
            engine: ProximityEngine::new(store),
            diagnostics: None,
            failure_log: Mutex::new(FailureLog::new()),
            in_flight: AtomicBool::new(false),
            counters: CycleCounters::default(),
        }
    }

    /// Persist failed cycles to `storage`, continuing an existing ring.
    pub fn with_diagnostics(mut self, storage: DiagnosticsStorage) -> Self {
        {
            let guard = storage.lock().unwrap_or_else(PoisonError::into_inner);
            self.failure_log
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner)
                .init(&*guard);
        }
        self.diagnostics = Some(storage);
        self
    }

    // ── Cycle ─────────────────────────────────────────────────

    /// Run one check cycle.  Never panics and never returns an error to
    /// the caller; failures are logged, emitted and recorded.
    pub fn run_cycle(&self) -> CycleOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Cycle: previous cycle still running, skipping");
            self.counters.overlap_skipped();
            self.emit(&AppEvent::CycleSkipped(SkipReason::Overlapping));
            return CycleOutcome::Overlapping;
        }

        self.counters.cycle_run();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run_inner()));
        self.in_flight.store(false, Ordering::Release);

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => CycleOutcome::Failed(e),
            Err(payload) => CycleOutcome::Failed(CycleError::Panicked(panic_message(&*payload))),
        };

        match &outcome {
            CycleOutcome::Completed { checked, triggered } => {
                self.emit(&AppEvent::CycleCompleted {
                    checked: *checked,
                    triggered: *triggered,
                });
            }
            CycleOutcome::NoFix => {
                self.counters.no_fix();
                self.emit(&AppEvent::CycleSkipped(SkipReason::NoFix));
            }
            CycleOutcome::TrackingDisabled => {
                self.emit(&AppEvent::CycleSkipped(SkipReason::TrackingDisabled));
            }
            CycleOutcome::Failed(e) => {
                self.counters.cycle_failed();
                self.record_failure(e);
            }
            CycleOutcome::Overlapping => {}
        }
        outcome
    }

    fn run_inner(&self) -> Result<CycleOutcome, CycleError> {
        let p = &self.ports;

        if !p.permission.has_location_permission() {
            return Err(CycleError::PermissionDenied);
        }
        if !p.settings.is_tracking_enabled() {
            info!("Cycle: tracking disabled");
            return Ok(CycleOutcome::TrackingDisabled);
        }

        let config = p.settings.current_config();
        let zones = p.zones.list_zones();
        if let Err(e) = self.engine.prune_orphans(&zones) {
            warn!("Cycle: orphan pruning failed: {}", e);
        }

        let Some(position) = p.location.last_known_position() else {
            info!("Cycle: no position fix");
            return Ok(CycleOutcome::NoFix);
        };

        let active: Vec<Zone> = zones
            .into_iter()
            .filter(|z| p.settings.is_zone_active_now(z))
            .collect();
        debug!(
            "Cycle: {} active zone(s) at ({:.5}, {:.5})",
            active.len(),
            position.lat(),
            position.lon()
        );

        let now = p.clock.now_epoch_secs();
        let eval = self
            .engine
            .evaluate(Some(&position), &active, config.proximity_threshold_m, now);

        let mut errors: Vec<CycleError> = eval
            .failures
            .into_iter()
            .map(|(zone_id, source)| CycleError::Persistence { zone_id, source })
            .collect();

        // Entry state is already committed, so every trigger gets its
        // action even when an earlier one panics.
        for trigger in &eval.triggers {
            let delivered =
                panic::catch_unwind(AssertUnwindSafe(|| p.actions.on_zone_entered(&trigger.zone)));
            if let Err(payload) = delivered {
                let msg = panic_message(&*payload);
                warn!("Cycle: action for zone {} panicked: {}", trigger.zone.id, msg);
                errors.push(CycleError::Panicked(msg));
            }
            self.emit(&AppEvent::ZoneEntered {
                zone_id: trigger.zone.id,
                name: trigger.zone.name.clone(),
                distance_m: trigger.distance_m,
            });
        }
        self.counters.triggered(eval.triggers.len());

        let mut errors = errors.into_iter();
        if let Some(first) = errors.next() {
            for other in errors {
                self.record_failure(&other);
            }
            return Err(first);
        }

        Ok(CycleOutcome::Completed {
            checked: active.len(),
            triggered: eval.triggers.len(),
        })
    }

    // ── Diagnostics ───────────────────────────────────────────

    /// Log, emit and persist a failure.  Failed cycles are counted
    /// separately, once per cycle.
    pub fn record_failure(&self, err: &CycleError) {
        warn!("Cycle: failed: {}", err);
        self.emit(&AppEvent::CycleFailed(err.clone()));

        if let Some(storage) = &self.diagnostics {
            let entry = FailureEntry::from_error(self.ports.clock.now_epoch_secs(), err);
            let mut log = self.failure_log.lock().unwrap_or_else(PoisonError::into_inner);
            let mut guard = storage.lock().unwrap_or_else(PoisonError::into_inner);
            log.record(&mut *guard, &entry);
        }
    }

    /// Persisted failures, oldest first.  Empty without diagnostics.
    pub fn failure_entries(&self) -> Vec<FailureEntry> {
        let Some(storage) = &self.diagnostics else {
            return Vec::new();
        };
        let log = self.failure_log.lock().unwrap_or_else(PoisonError::into_inner);
        let guard = storage.lock().unwrap_or_else(PoisonError::into_inner);
        log.read_all(&*guard).into_iter().collect()
    }

    /// Count a cycle as failed after the fact (host limit exceeded).
    pub fn mark_cycle_failed(&self) {
        self.counters.cycle_failed();
    }

    pub fn metrics(&self) -> RuntimeMetrics {
        self.counters.snapshot()
    }

    // ── Queries used by the scheduler ─────────────────────────

    pub fn tracking_enabled(&self) -> bool {
        self.ports.settings.is_tracking_enabled()
    }

    pub fn current_interval_secs(&self) -> u32 {
        self.ports.settings.current_config().check_interval_secs
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.ports.events
    }

    /// Cascade delete for a removed zone.
    pub fn forget_zone(&self, zone_id: ZoneId) -> Result<(), StateStoreError> {
        self.engine.forget_zone(zone_id)
    }

    fn emit(&self, event: &AppEvent) {
        self.ports.events.emit(event);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

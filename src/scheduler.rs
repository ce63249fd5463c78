//! Adaptive check scheduler.
//!
//! Keeps exactly one check job alive in a single named host slot and
//! picks the cheapest host primitive that honours the requested cadence.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │   schedule_checks(interval)                                  │
//! │        │                                                     │
//! │        ▼                                                     │
//! │   interval >= host minimum ?                                 │
//! │     yes ──▶ Periodic { interval }   host recurs by itself    │
//! │     no  ──▶ OneShot  { delay }      re-armed after each run  │
//! │                                                              │
//! │   job ──▶ CheckService::run_cycle() ──▶ after_cycle()        │
//! │             stop  : tracking off, or no permission (1-shot)  │
//! │             re-arm: one-shot, or the resolved mode changed   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every arm bumps a generation counter under the arm lock.  A job
//! carries the generation it was armed with; a stale job (replaced or
//! cancelled after it was dispatched) neither runs a cycle nor re-arms.
//! Lock order is always arm lock, then the host's slot lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::app::commands::AppCommand;
use crate::app::events::AppEvent;
use crate::app::ports::{Job, WorkHost};
use crate::app::service::{CheckService, CycleOutcome};
use crate::error::CycleError;

/// The single host slot holding the check job.
pub const CHECK_TASK_SLOT: &str = "zone-proximity-check";

// ═══════════════════════════════════════════════════════════════
//  Schedule mode
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    /// Run once after `delay`; the scheduler re-arms after each run.
    OneShot { delay: Duration },
    /// The host recurs every `interval` on its own.
    Periodic { interval: Duration },
}

impl ScheduleMode {
    /// Pick the mode for a requested interval.  Intervals at or above
    /// the host's periodic granularity are periodic; a zero interval is
    /// treated as one second.
    pub fn resolve(interval_secs: u32, min_periodic: Duration) -> Self {
        let requested = Duration::from_secs(u64::from(interval_secs.max(1)));
        if requested >= min_periodic {
            Self::Periodic {
                interval: requested,
            }
        } else {
            Self::OneShot { delay: requested }
        }
    }

    pub fn period(&self) -> Duration {
        match self {
            Self::OneShot { delay } => *delay,
            Self::Periodic { interval } => *interval,
        }
    }

    pub fn is_periodic(&self) -> bool {
        matches!(self, Self::Periodic { .. })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

struct ArmState {
    generation: u64,
    active: Option<ScheduleMode>,
}

pub struct AdaptiveScheduler {
    service: Arc<CheckService>,
    host: Arc<dyn WorkHost>,
    arm: Mutex<ArmState>,
    me: Weak<Self>,
}

impl AdaptiveScheduler {
    pub fn new(service: Arc<CheckService>, host: Arc<dyn WorkHost>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            service,
            host,
            arm: Mutex::new(ArmState {
                generation: 0,
                active: None,
            }),
            me: me.clone(),
        })
    }

    /// Arm (or replace) the check job.  Idempotent: calling twice leaves
    /// one job armed with the second interval.
    pub fn schedule_checks(&self, interval_secs: u32) {
        let mode = ScheduleMode::resolve(interval_secs, self.host.min_periodic_interval());
        let mut arm = self.lock_arm();
        self.arm_locked(&mut arm, mode);
    }

    /// Stop all future checks.  A cycle already running finishes but
    /// does not re-arm.
    pub fn cancel_checks(&self) {
        let mut arm = self.lock_arm();
        self.stop_locked(&mut arm);
    }

    pub fn handle_command(&self, cmd: AppCommand) {
        match cmd {
            AppCommand::ScheduleChecks(secs) => self.schedule_checks(secs),
            AppCommand::CancelChecks => self.cancel_checks(),
            AppCommand::ZoneDeleted(zone_id) => {
                if let Err(source) = self.service.forget_zone(zone_id) {
                    self.service
                        .record_failure(&CycleError::Persistence { zone_id, source });
                }
            }
            AppCommand::RunNow => {
                let outcome = self.service.run_cycle();
                debug!("Scheduler: on-demand cycle -> {:?}", outcome);
            }
        }
    }

    /// Mode of the job currently armed, if any.
    pub fn active_mode(&self) -> Option<ScheduleMode> {
        self.lock_arm().active
    }

    pub fn service(&self) -> &Arc<CheckService> {
        &self.service
    }

    // ── Job body ──────────────────────────────────────────────

    fn fire(&self, generation: u64) {
        if self.lock_arm().generation != generation {
            debug!("Scheduler: stale job (gen {}) ignored", generation);
            return;
        }

        let started = Instant::now();
        let outcome = self.service.run_cycle();
        let elapsed = started.elapsed();

        if let Some(limit) = self.host.max_execution_time() {
            if elapsed > limit {
                self.service.record_failure(&CycleError::HostTimeout {
                    elapsed_ms: elapsed.as_millis() as u64,
                    limit_ms: limit.as_millis() as u64,
                });
                if !matches!(outcome, CycleOutcome::Failed(_)) {
                    self.service.mark_cycle_failed();
                }
            }
        }

        self.after_cycle(generation, &outcome);
    }

    fn after_cycle(&self, generation: u64, outcome: &CycleOutcome) {
        let mut arm = self.lock_arm();
        if arm.generation != generation {
            debug!("Scheduler: re-armed or cancelled during cycle, leaving as is");
            return;
        }
        let Some(current) = arm.active else {
            return;
        };

        if outcome.stops_schedule(&current) || !self.service.tracking_enabled() {
            info!("Scheduler: stopping after {:?}", outcome);
            self.stop_locked(&mut arm);
            return;
        }

        let next = ScheduleMode::resolve(
            self.service.current_interval_secs(),
            self.host.min_periodic_interval(),
        );
        if current.is_periodic() && next == current {
            // Host keeps recurring with the same job.
            return;
        }
        self.arm_locked(&mut arm, next);
    }

    // ── Arm / stop (arm lock held) ────────────────────────────

    fn arm_locked(&self, arm: &mut ArmState, mode: ScheduleMode) {
        arm.generation = arm.generation.wrapping_add(1);
        let generation = arm.generation;
        let me = self.me.clone();
        let job: Job = Arc::new(move || {
            if let Some(scheduler) = me.upgrade() {
                scheduler.fire(generation);
            }
        });
        self.host.submit(CHECK_TASK_SLOT, mode, job);

        if arm.active != Some(mode) {
            info!("Scheduler: armed {:?}", mode);
        }
        arm.active = Some(mode);
        self.service.events().emit(&AppEvent::ScheduleArmed(mode));
    }

    fn stop_locked(&self, arm: &mut ArmState) {
        arm.generation = arm.generation.wrapping_add(1);
        let was = arm.active.take();
        self.host.cancel(CHECK_TASK_SLOT);
        if was.is_some() {
            info!("Scheduler: checks cancelled");
            self.service.events().emit(&AppEvent::ScheduleCancelled);
        }
    }

    fn lock_arm(&self) -> MutexGuard<'_, ArmState> {
        self.arm.lock().unwrap_or_else(|e| {
            warn!("Scheduler: arm lock poisoned, recovering");
            PoisonError::into_inner(e)
        })
    }
}

//! Log-based sink adapters.
//!
//! [`LogEventSink`] writes structured application events as single log
//! lines.  [`LogActionSink`] is the simulation stand-in for the real
//! user-visible action (launching a companion app, a haptic pattern).

use log::{info, warn};

use crate::app::events::{AppEvent, SkipReason};
use crate::app::ports::{ActionSink, EventSink};
use crate::scheduler::ScheduleMode;
use crate::zone::Zone;

/// Adapter that logs every [`AppEvent`].
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &AppEvent) {
        match event {
            AppEvent::CycleCompleted { checked, triggered } => {
                info!("CYCLE | checked={} triggered={}", checked, triggered);
            }
            AppEvent::ZoneEntered {
                zone_id,
                name,
                distance_m,
            } => {
                info!(
                    "ENTER | zone={} name={} distance={:.1}m",
                    zone_id,
                    name.as_deref().unwrap_or("-"),
                    distance_m
                );
            }
            AppEvent::CycleSkipped(reason) => {
                let why = match reason {
                    SkipReason::NoFix => "no position fix",
                    SkipReason::TrackingDisabled => "tracking disabled",
                    SkipReason::Overlapping => "previous cycle still running",
                };
                info!("CYCLE | skipped: {}", why);
            }
            AppEvent::CycleFailed(err) => {
                warn!("FAIL | {}", err);
            }
            AppEvent::ScheduleArmed(mode) => match mode {
                ScheduleMode::OneShot { delay } => {
                    info!("SCHED | one-shot in {}s", delay.as_secs());
                }
                ScheduleMode::Periodic { interval } => {
                    info!("SCHED | periodic every {}s", interval.as_secs());
                }
            },
            AppEvent::ScheduleCancelled => {
                info!("SCHED | cancelled");
            }
        }
    }
}

/// Action sink that only logs the entry.
pub struct LogActionSink;

impl LogActionSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogActionSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionSink for LogActionSink {
    fn on_zone_entered(&self, zone: &Zone) {
        info!("ACTION | launching for zone {} '{}'", zone.id, zone.label());
    }
}

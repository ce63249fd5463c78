//! Outbound application events.
//!
//! The [`CheckService`](super::service::CheckService) and the
//! [`AdaptiveScheduler`](crate::scheduler::AdaptiveScheduler) emit these
//! through the [`EventSink`](super::ports::EventSink) port.  Cycles have
//! no caller to report to, so this stream (plus the failure log) is the
//! only place their outcome becomes visible.

use crate::error::CycleError;
use crate::scheduler::ScheduleMode;
use crate::zone::ZoneId;

/// Structured events emitted by the engine core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A cycle evaluated `checked` zones and fired `triggered` actions.
    CycleCompleted { checked: usize, triggered: usize },

    /// The device entered a zone; the action sink has been invoked.
    ZoneEntered {
        zone_id: ZoneId,
        name: Option<String>,
        distance_m: f64,
    },

    /// A cycle ran but did not evaluate.
    CycleSkipped(SkipReason),

    /// A cycle failed; the schedule decides separately whether to re-arm.
    CycleFailed(CycleError),

    /// The check slot was (re)armed.
    ScheduleArmed(ScheduleMode),

    /// The check slot was emptied.
    ScheduleCancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The location source had no fix.
    NoFix,
    /// Tracking was switched off after the schedule was armed.
    TrackingDisabled,
    /// Another cycle was still in flight.
    Overlapping,
}

//! Inbound commands to the engine.
//!
//! These represent requests from configuration / UI layers that the
//! [`AdaptiveScheduler`](crate::scheduler::AdaptiveScheduler) interprets
//! and acts upon.

use crate::zone::ZoneId;

/// Commands that external adapters can send into the engine core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Arm (or re-arm) periodic checks at the given interval in seconds.
    ScheduleChecks(u32),

    /// Stop all future checks.
    CancelChecks,

    /// A zone was deleted by the user; drop its proximity state.
    ZoneDeleted(ZoneId),

    /// Run one check cycle immediately, outside the cadence.
    RunNow,
}

//! Clock adapters.
//!
//! - [`SystemClock`] reads the host wall clock and derives local time
//!   from a fixed UTC offset.
//! - [`ManualClock`] is set explicitly; tests and replayed scenarios
//!   drive it.

use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::app::ports::ClockPort;
use crate::zone::{LocalTime, TimeOfDay, Weekday};

/// Reject obviously unsynced time (before 2020-01-01).
const EPOCH_2020: u64 = 1_577_836_800;

const SECS_PER_DAY: i64 = 86_400;

/// Convert epoch seconds plus a UTC offset to local weekday and time.
pub fn local_time_from_epoch(epoch_secs: u64, utc_offset_secs: i32) -> Option<LocalTime> {
    let local = i64::try_from(epoch_secs).ok()? + i64::from(utc_offset_secs);
    let days = local.div_euclid(SECS_PER_DAY);
    let secs_of_day = local.rem_euclid(SECS_PER_DAY);
    // 1970-01-01 was a Thursday (Mon = 0).
    let weekday = Weekday::from_index((days + 3).rem_euclid(7) as u8).ok()?;
    let time = TimeOfDay::new((secs_of_day / 3600) as u8, ((secs_of_day % 3600) / 60) as u8).ok()?;
    Some(LocalTime { weekday, time })
}

pub struct SystemClock {
    utc_offset_secs: i32,
}

impl SystemClock {
    pub fn new(utc_offset_secs: i32) -> Self {
        Self { utc_offset_secs }
    }

    pub fn utc() -> Self {
        Self::new(0)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl ClockPort for SystemClock {
    fn now_epoch_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn local_time(&self) -> Option<LocalTime> {
        let now = self.now_epoch_secs();
        if now < EPOCH_2020 {
            return None;
        }
        local_time_from_epoch(now, self.utc_offset_secs)
    }
}

/// Settable clock.  `local_time` is derived from the epoch value unless
/// it has been marked unknown.
pub struct ManualClock {
    inner: Mutex<ManualInner>,
}

struct ManualInner {
    epoch_secs: u64,
    utc_offset_secs: i32,
    wall_clock_known: bool,
}

impl ManualClock {
    pub fn new(epoch_secs: u64) -> Self {
        Self {
            inner: Mutex::new(ManualInner {
                epoch_secs,
                utc_offset_secs: 0,
                wall_clock_known: true,
            }),
        }
    }

    pub fn set(&self, epoch_secs: u64) {
        self.lock().epoch_secs = epoch_secs;
    }

    pub fn advance_secs(&self, secs: u64) {
        let mut inner = self.lock();
        inner.epoch_secs = inner.epoch_secs.saturating_add(secs);
    }

    pub fn set_utc_offset(&self, secs: i32) {
        self.lock().utc_offset_secs = secs;
    }

    /// Simulate a wall clock that has not been synced yet.
    pub fn set_wall_clock_known(&self, known: bool) {
        self.lock().wall_clock_known = known;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ClockPort for ManualClock {
    fn now_epoch_secs(&self) -> u64 {
        self.lock().epoch_secs
    }

    fn local_time(&self) -> Option<LocalTime> {
        let inner = self.lock();
        if !inner.wall_clock_known {
            return None;
        }
        local_time_from_epoch(inner.epoch_secs, inner.utc_offset_secs)
    }
}

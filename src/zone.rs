//! Zone definitions and time-of-day / weekday gating.
//!
//! Zones are owned by the outside world (the zone store); the engine only
//! reads them.  Gating decides whether a zone takes part in a cycle at
//! all and is applied by the settings layer, never by the proximity
//! engine itself.

use serde::{Deserialize, Serialize};

use crate::error::ZoneError;
use crate::geo::Position;

/// Stable zone identity.
pub type ZoneId = i64;

// ═══════════════════════════════════════════════════════════════
//  Time of day
// ═══════════════════════════════════════════════════════════════

/// Local wall-clock time with minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimeOfDay", into = "RawTimeOfDay")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

#[derive(Serialize, Deserialize)]
struct RawTimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ZoneError> {
        if hour > 23 {
            return Err(ZoneError::InvalidHour(hour));
        }
        if minute > 59 {
            return Err(ZoneError::InvalidMinute(minute));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Minutes since local midnight (0..1440).
    pub fn minute_of_day(&self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }
}

impl TryFrom<RawTimeOfDay> for TimeOfDay {
    type Error = ZoneError;

    fn try_from(raw: RawTimeOfDay) -> Result<Self, Self::Error> {
        Self::new(raw.hour, raw.minute)
    }
}

impl From<TimeOfDay> for RawTimeOfDay {
    fn from(t: TimeOfDay) -> Self {
        Self {
            hour: t.hour,
            minute: t.minute,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Active window
// ═══════════════════════════════════════════════════════════════

/// Daily active window, inclusive at both ends.
///
/// When `end` is earlier than `start` the window wraps midnight:
/// 22:00–02:00 covers 22:00..=23:59 and 00:00..=02:00.  `start == end`
/// covers exactly that one minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl ActiveWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Build from raw `(hour, minute)` pairs.
    pub fn from_hm(start: (u8, u8), end: (u8, u8)) -> Result<Self, ZoneError> {
        Ok(Self {
            start: TimeOfDay::new(start.0, start.1)?,
            end: TimeOfDay::new(end.0, end.1)?,
        })
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, t: TimeOfDay) -> bool {
        if self.wraps_midnight() {
            t >= self.start || t <= self.end
        } else {
            t >= self.start && t <= self.end
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Weekdays
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Weekday {
    Mon = 0,
    Tue = 1,
    Wed = 2,
    Thu = 3,
    Fri = 4,
    Sat = 5,
    Sun = 6,
}

impl Weekday {
    pub fn from_index(index: u8) -> Result<Self, ZoneError> {
        match index {
            0 => Ok(Self::Mon),
            1 => Ok(Self::Tue),
            2 => Ok(Self::Wed),
            3 => Ok(Self::Thu),
            4 => Ok(Self::Fri),
            5 => Ok(Self::Sat),
            6 => Ok(Self::Sun),
            other => Err(ZoneError::InvalidWeekday(other)),
        }
    }

    pub const fn mask(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of weekdays as a 7-bit mask (bit 0 = Monday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct WeekdaySet(u8);

impl TryFrom<u8> for WeekdaySet {
    type Error = ZoneError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        if bits & !0x7F != 0 {
            return Err(ZoneError::InvalidWeekdayMask(bits));
        }
        Ok(Self(bits))
    }
}

impl From<WeekdaySet> for u8 {
    fn from(days: WeekdaySet) -> Self {
        days.0
    }
}

impl WeekdaySet {
    pub const ALL: Self = Self(0x7F);
    pub const WORKDAYS: Self = Self(0x1F);
    pub const WEEKEND: Self = Self(0x60);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_days(days: &[Weekday]) -> Self {
        Self(days.iter().fold(0, |acc, d| acc | d.mask()))
    }

    pub fn with(self, day: Weekday) -> Self {
        Self(self.0 | day.mask())
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & day.mask() != 0
    }

    pub fn bits(&self) -> u8 {
        self.0 & 0x7F
    }
}

/// A local-time instant as seen by the gating logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub weekday: Weekday,
    pub time: TimeOfDay,
}

// ═══════════════════════════════════════════════════════════════
//  Zone
// ═══════════════════════════════════════════════════════════════

/// A user-defined circular region of interest.  The radius is global
/// (the configured proximity threshold), not per zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub center: Position,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub window: Option<ActiveWindow>,
    /// Days the zone is active on; `None` means every day.
    #[serde(default)]
    pub days: Option<WeekdaySet>,
}

impl Zone {
    pub fn new(id: ZoneId, center: Position) -> Self {
        Self {
            id,
            center,
            name: None,
            window: None,
            days: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_window(mut self, window: ActiveWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_days(mut self, days: WeekdaySet) -> Self {
        self.days = Some(days);
        self
    }

    /// Label for log lines.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Whether the zone takes part in checks at `now`.
    ///
    /// The weekday gate applies to the weekday of `now` itself, also in
    /// the after-midnight tail of a wrapping window.
    pub fn is_active_at(&self, now: &LocalTime) -> bool {
        let day_ok = self.days.is_none_or(|d| d.contains(now.weekday));
        let time_ok = self.window.is_none_or(|w| w.contains(now.time));
        day_ok && time_ok
    }
}

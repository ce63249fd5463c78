//! Unified error types for the zonewatch engine.
//!
//! Every port family has its own small error enum; all of them convert
//! into the crate-level [`Error`] so setup code (scenario loading, config
//! bootstrap) can use a single `Result` alias.  Check cycles never
//! propagate errors to a caller: they are folded into [`CycleError`] at
//! the cycle boundary, logged, and recorded in the failure log.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};
use crate::zone::ZoneId;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A coordinate was outside the WGS84 range.
    Geo(GeoError),
    /// A zone definition was invalid.
    Zone(ZoneError),
    /// Configuration could not be loaded, validated or saved.
    Config(ConfigError),
    /// The key-value backend failed.
    Storage(StorageError),
    /// The proximity state store failed.
    StateStore(StateStoreError),
    /// A scenario / fixture file could not be parsed.
    Parse(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geo(e) => write!(f, "geo: {e}"),
            Self::Zone(e) => write!(f, "zone: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::StateStore(e) => write!(f, "state store: {e}"),
            Self::Parse(msg) => write!(f, "parse: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<GeoError> for Error {
    fn from(e: GeoError) -> Self {
        Self::Geo(e)
    }
}

impl From<ZoneError> for Error {
    fn from(e: ZoneError) -> Self {
        Self::Zone(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<StateStoreError> for Error {
    fn from(e: StateStoreError) -> Self {
        Self::StateStore(e)
    }
}

// ---------------------------------------------------------------------------
// Geo errors
// ---------------------------------------------------------------------------

/// Out-of-range input is rejected at construction, never clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoError {
    /// Latitude not in `[-90, 90]` (or not finite).
    LatitudeOutOfRange(f64),
    /// Longitude not in `[-180, 180]` (or not finite).
    LongitudeOutOfRange(f64),
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LatitudeOutOfRange(v) => write!(f, "latitude {v} outside [-90, 90]"),
            Self::LongitudeOutOfRange(v) => write!(f, "longitude {v} outside [-180, 180]"),
        }
    }
}

impl std::error::Error for GeoError {}

// ---------------------------------------------------------------------------
// Zone errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneError {
    /// Hour not in `0..=23`.
    InvalidHour(u8),
    /// Minute not in `0..=59`.
    InvalidMinute(u8),
    /// Weekday index not in `0..=6`.
    InvalidWeekday(u8),
    /// Weekday mask with bits above Sunday set.
    InvalidWeekdayMask(u8),
}

impl fmt::Display for ZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHour(h) => write!(f, "hour {h} outside 0-23"),
            Self::InvalidMinute(m) => write!(f, "minute {m} outside 0-59"),
            Self::InvalidWeekday(d) => write!(f, "weekday {d} outside 0-6"),
            Self::InvalidWeekdayMask(b) => write!(f, "weekday mask {b:#04x} has bits above 0x7f"),
        }
    }
}

impl std::error::Error for ZoneError {}

// ---------------------------------------------------------------------------
// Proximity state store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateStoreError {
    /// The underlying key-value backend failed.
    Storage(StorageError),
    /// A stored record for this zone could not be decoded.
    Corrupt(ZoneId),
    /// The store could not encode a record.
    Encode,
}

impl fmt::Display for StateStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "backend: {e}"),
            Self::Corrupt(id) => write!(f, "corrupt record for zone {id}"),
            Self::Encode => write!(f, "record encoding failed"),
        }
    }
}

impl std::error::Error for StateStoreError {}

impl From<StorageError> for StateStoreError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Cycle errors
// ---------------------------------------------------------------------------

/// Why a check cycle failed.  A missing position fix is deliberately not
/// here: it is a normal "no signal" cycle, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    /// Location permission is not granted.  Terminal for the cycle.
    PermissionDenied,
    /// The state write (or read) for a zone failed; its trigger was withheld.
    Persistence {
        zone_id: ZoneId,
        source: StateStoreError,
    },
    /// Evaluation or the action sink panicked.
    Panicked(String),
    /// The cycle ran longer than the execution host allows.
    HostTimeout { elapsed_ms: u64, limit_ms: u64 },
}

impl CycleError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::PermissionDenied => FailureKind::PermissionDenied,
            Self::Persistence { .. } => FailureKind::Persistence,
            Self::Panicked(_) => FailureKind::Panicked,
            Self::HostTimeout { .. } => FailureKind::HostTimeout,
        }
    }
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "location permission denied"),
            Self::Persistence { zone_id, source } => {
                write!(f, "state persistence failed for zone {zone_id}: {source}")
            }
            Self::Panicked(msg) => write!(f, "cycle panicked: {msg}"),
            Self::HostTimeout {
                elapsed_ms,
                limit_ms,
            } => write!(f, "cycle took {elapsed_ms}ms, host limit {limit_ms}ms"),
        }
    }
}

impl std::error::Error for CycleError {}

/// Compact discriminant stored in the persisted failure log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum FailureKind {
    PermissionDenied = 1,
    Persistence = 2,
    Panicked = 3,
    HostTimeout = 4,
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

//! Port traits: the hexagonal boundary between the engine and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ CheckService / AdaptiveScheduler (domain)
//! ```
//!
//! Driven adapters (zone store, settings, location, permission, action
//! sink, storage, execution host) implement these traits.  The domain
//! holds them as `Arc<dyn Port>` because a check cycle runs on whatever
//! thread the execution host chooses, so every runtime port is
//! `Send + Sync` and takes `&self`.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{EngineConfig, TrackerConfig};
use crate::error::StateStoreError;
use crate::geo::Position;
use crate::proximity::ProximityState;
use crate::scheduler::ScheduleMode;
use crate::zone::{LocalTime, Zone, ZoneId};

use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Zone store (driven adapter: user data → domain, read-only)
// ───────────────────────────────────────────────────────────────

pub trait ZoneStore: Send + Sync {
    /// Snapshot of every zone for this cycle.
    fn list_zones(&self) -> Vec<Zone>;
}

// ───────────────────────────────────────────────────────────────
// Settings port (driven adapter: user preferences → domain)
// ───────────────────────────────────────────────────────────────

pub trait SettingsPort: Send + Sync {
    fn current_config(&self) -> EngineConfig;

    fn is_tracking_enabled(&self) -> bool;

    /// Time-window / weekday gating for one zone, evaluated now.
    fn is_zone_active_now(&self, zone: &Zone) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Location + permission ports (driven adapters: platform → domain)
// ───────────────────────────────────────────────────────────────

pub trait LocationSource: Send + Sync {
    /// Latest fix, or `None` when the platform has none.  Any timeout is
    /// the implementation's own.
    fn last_known_position(&self) -> Option<Position>;
}

pub trait PermissionPort: Send + Sync {
    fn has_location_permission(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Action sink (driven adapter: domain → user-visible action)
// ───────────────────────────────────────────────────────────────

/// Receives each qualifying zone entry exactly once.  What happens next
/// (launching a companion app, a haptic pattern, one consolidated action
/// for several zones) is the adapter's business.
pub trait ActionSink: Send + Sync {
    fn on_zone_entered(&self, zone: &Zone);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

pub trait ClockPort: Send + Sync {
    /// Wall-clock seconds since the Unix epoch.
    fn now_epoch_secs(&self) -> u64;

    /// Local weekday and time of day, `None` if the wall clock is unknown.
    fn local_time(&self) -> Option<LocalTime>;
}

// ───────────────────────────────────────────────────────────────
// Proximity state store (engine-owned persistence)
// ───────────────────────────────────────────────────────────────

/// One current record per zone id; no history.
///
/// `put` MUST be atomic per record: either the new record is stored or
/// the previous one is left untouched.
pub trait ProximityStateStore: Send + Sync {
    fn get(&self, zone_id: ZoneId) -> Result<Option<ProximityState>, StateStoreError>;

    fn put(&self, state: &ProximityState) -> Result<(), StateStoreError>;

    /// Delete a record.  Returns `Ok(())` even if none existed.
    fn remove(&self, zone_id: ZoneId) -> Result<(), StateStoreError>;

    /// Every zone id with a stored record.
    fn zone_ids(&self) -> Result<Vec<ZoneId>, StateStoreError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists tracker configuration.
///
/// Implementations MUST validate before persisting; invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not clamped.
pub trait ConfigPort {
    /// Returns [`TrackerConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<TrackerConfig, ConfigError>;

    fn save(&self, config: &TrackerConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ key-value backend)
// ───────────────────────────────────────────────────────────────

/// Namespaced key-value blob storage.
///
/// Write operations MUST be atomic, with no partial writes.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;

    /// All keys currently stored in `namespace`.
    fn keys(&self, namespace: &str) -> Vec<String>;
}

// ───────────────────────────────────────────────────────────────
// Work host (driven adapter: domain → platform execution primitive)
// ───────────────────────────────────────────────────────────────

/// A unit of background work.
pub type Job = Arc<dyn Fn() + Send + Sync>;

/// "Run this unit of work once, possibly after a delay, possibly
/// recurring."
///
/// Work is keyed by a slot name.  `submit` into an occupied slot MUST
/// replace the previous work atomically: after it returns, the old job
/// never starts again.  A job may call `submit`/`cancel` on its own slot
/// while running.
pub trait WorkHost: Send + Sync {
    fn submit(&self, slot: &'static str, mode: ScheduleMode, job: Job);

    /// Remove whatever is in `slot`.  Returns whether anything was there.
    fn cancel(&self, slot: &'static str) -> bool;

    /// Mode of the work currently installed in `slot`.
    fn scheduled(&self, slot: &'static str) -> Option<ScheduleMode>;

    /// Shortest interval the native recurring primitive accepts.
    fn min_periodic_interval(&self) -> Duration;

    /// Maximum run time for one job, if the host enforces one.
    fn max_execution_time(&self) -> Option<Duration> {
        None
    }
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first start).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl std::error::Error for StorageError {}

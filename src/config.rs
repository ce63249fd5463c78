//! Tracker configuration parameters
//!
//! The engine reads [`EngineConfig`] fresh from the settings port on every
//! cycle; [`TrackerConfig`] is the persisted superset that also carries the
//! tracking switch and the host's periodic granularity.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Minimum native periodic granularity on the reference platform.
pub const DEFAULT_MIN_PERIODIC_SECS: u32 = 900;

/// Per-cycle engine parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Containment radius around every zone centre, in metres (inclusive).
    pub proximity_threshold_m: u32,
    /// Requested time between checks, in seconds.
    pub check_interval_secs: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_m: 200,
            check_interval_secs: 300, // 5 min
        }
    }
}

/// Persisted tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub engine: EngineConfig,
    /// Master switch; when off no cycle evaluates and nothing re-arms.
    pub tracking_enabled: bool,
    /// Shortest interval the host's recurring primitive supports.
    pub min_periodic_secs: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            tracking_enabled: true,
            min_periodic_secs: DEFAULT_MIN_PERIODIC_SECS,
        }
    }
}

/// Range-check a configuration before it is used or persisted.
///
/// Invalid values are rejected, not clamped.
pub fn validate_config(cfg: &TrackerConfig) -> Result<(), ConfigError> {
    if !(1..=100_000).contains(&cfg.engine.proximity_threshold_m) {
        return Err(ConfigError::ValidationFailed(
            "proximity_threshold_m must be 1–100000",
        ));
    }
    if !(1..=86_400).contains(&cfg.engine.check_interval_secs) {
        return Err(ConfigError::ValidationFailed(
            "check_interval_secs must be 1–86400",
        ));
    }
    if !(60..=86_400).contains(&cfg.min_periodic_secs) {
        return Err(ConfigError::ValidationFailed(
            "min_periodic_secs must be 60–86400",
        ));
    }
    Ok(())
}

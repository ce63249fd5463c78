//! In-process settings adapter.
//!
//! Holds the live [`TrackerConfig`] behind a lock so a UI thread can
//! change it while cycles run on the host thread.  Zone gating reads the
//! injected clock.

use std::sync::{Arc, PoisonError, RwLock};

use log::info;

use crate::app::ports::{ClockPort, ConfigError, SettingsPort};
use crate::config::{EngineConfig, TrackerConfig, validate_config};
use crate::zone::Zone;

pub struct SharedSettings {
    config: RwLock<TrackerConfig>,
    clock: Arc<dyn ClockPort>,
}

impl SharedSettings {
    pub fn new(config: TrackerConfig, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            config: RwLock::new(config),
            clock,
        }
    }

    pub fn snapshot(&self) -> TrackerConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole configuration after validation.
    pub fn update(&self, config: TrackerConfig) -> Result<(), ConfigError> {
        validate_config(&config)?;
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        Ok(())
    }

    pub fn set_tracking_enabled(&self, enabled: bool) {
        self.config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .tracking_enabled = enabled;
        info!("Settings: tracking {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn set_check_interval(&self, secs: u32) -> Result<(), ConfigError> {
        let mut cfg = self.snapshot();
        cfg.engine.check_interval_secs = secs;
        self.update(cfg)?;
        info!("Settings: check interval {}s", secs);
        Ok(())
    }

    pub fn set_proximity_threshold(&self, metres: u32) -> Result<(), ConfigError> {
        let mut cfg = self.snapshot();
        cfg.engine.proximity_threshold_m = metres;
        self.update(cfg)
    }
}

impl SettingsPort for SharedSettings {
    fn current_config(&self) -> EngineConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .engine
    }

    fn is_tracking_enabled(&self) -> bool {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .tracking_enabled
    }

    /// An unknown wall clock leaves every zone active.
    fn is_zone_active_now(&self, zone: &Zone) -> bool {
        self.clock
            .local_time()
            .is_none_or(|now| zone.is_active_at(&now))
    }
}

//! Simulation scenario fixture.
//!
//! A scenario describes the simulated device: config overrides, the zone
//! list and a scripted route (one entry per location query, `null` for
//! "no fix").  Loaded from JSON by the host binary.

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::{TrackerConfig, validate_config};
use crate::error::{Error, Result};
use crate::geo::Position;
use crate::zone::{ActiveWindow, Zone};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub config: TrackerConfig,
    pub zones: Vec<Zone>,
    pub route: Vec<Option<Position>>,
    /// Wall-clock seconds the simulation runs before cancelling.
    pub run_secs: u64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            config: TrackerConfig::default(),
            zones: Vec::new(),
            route: Vec::new(),
            run_secs: 5,
        }
    }
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self> {
        let scenario: Self =
            serde_json::from_str(text).map_err(|_| Error::Parse("malformed scenario JSON"))?;
        validate_config(&scenario.config)?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|_| Error::Parse("scenario file unreadable"))?;
        let scenario = Self::from_json(&text)?;
        info!(
            "Scenario: {} zone(s), {} route step(s) from {}",
            scenario.zones.len(),
            scenario.route.len(),
            path.display()
        );
        Ok(scenario)
    }

    /// Built-in walk through central Zurich: arrive at the station, stay,
    /// leave for 5 km, lose the fix once, come back.
    pub fn demo() -> Result<Self> {
        let station = Position::new(47.3769, 8.5417)?;
        let away = Position::new(47.3769 + 0.04497, 8.5417)?;
        let lake = Position::new(47.3663, 8.5413)?;

        let zones = vec![
            Zone::new(1, station).with_name("Zurich HB"),
            Zone::new(2, lake)
                .with_name("Lakeside")
                .with_window(ActiveWindow::from_hm((22, 0), (2, 0))?),
        ];
        let config = TrackerConfig {
            engine: crate::config::EngineConfig {
                proximity_threshold_m: 200,
                check_interval_secs: 1,
            },
            ..TrackerConfig::default()
        };
        Ok(Self {
            config,
            zones,
            route: vec![Some(station), Some(station), Some(away), None, Some(station)],
            run_secs: 6,
        })
    }
}

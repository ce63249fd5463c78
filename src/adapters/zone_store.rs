//! In-memory zone store.

use std::sync::{PoisonError, RwLock};

use crate::app::ports::ZoneStore;
use crate::zone::{Zone, ZoneId};

#[derive(Default)]
pub struct StaticZoneStore {
    zones: RwLock<Vec<Zone>>,
}

impl StaticZoneStore {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            zones: RwLock::new(zones),
        }
    }

    /// Insert or replace by id.
    pub fn upsert(&self, zone: Zone) {
        let mut zones = self.zones.write().unwrap_or_else(PoisonError::into_inner);
        match zones.iter_mut().find(|z| z.id == zone.id) {
            Some(existing) => *existing = zone,
            None => zones.push(zone),
        }
    }

    /// Returns whether a zone was removed.  The caller is responsible for
    /// telling the engine (see `AppCommand::ZoneDeleted`).
    pub fn remove(&self, id: ZoneId) -> bool {
        let mut zones = self.zones.write().unwrap_or_else(PoisonError::into_inner);
        let before = zones.len();
        zones.retain(|z| z.id != id);
        zones.len() != before
    }
}

impl ZoneStore for StaticZoneStore {
    fn list_zones(&self) -> Vec<Zone> {
        self.zones
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

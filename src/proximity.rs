//! Proximity engine: per-zone hysteresis.
//!
//! ```text
//!            inside_now && (never seen || was outside)
//!   ┌─────────┐  ─────────── TRIGGER ───────────▶  ┌────────┐
//!   │ OUTSIDE │                                    │ INSIDE │ ◀─┐ inside_now
//!   │ / NEVER │  ◀──────── !inside_now ──────────  │        │ ──┘ (silent)
//!   └─────────┘                                    └────────┘
//! ```
//!
//! A zone fires on the outside→inside transition and on its first-ever
//! observation while inside, then stays silent until it has been seen
//! outside at least once.  The state record for every evaluated zone is
//! rewritten on every cycle, trigger or not.
//!
//! The engine knows nothing about time windows or weekdays; callers
//! decide which zones are evaluated.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::ProximityStateStore;
use crate::error::StateStoreError;
use crate::geo::{Position, distance_m};
use crate::zone::{Zone, ZoneId};

/// Persisted containment record, one per zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProximityState {
    pub zone_id: ZoneId,
    pub is_inside: bool,
    /// Epoch seconds of the check that produced this record.
    pub last_checked: u64,
}

/// A zone the device has just entered.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    pub zone: Zone,
    pub distance_m: f64,
}

/// Result of one [`ProximityEngine::evaluate`] pass.
#[derive(Debug, Default)]
pub struct Evaluation {
    /// Zones newly entered whose inside-state was durably written.
    pub triggers: Vec<TriggerEvent>,
    /// Zones whose state could not be read or written.  None of these
    /// appear in `triggers`.
    pub failures: Vec<(ZoneId, StateStoreError)>,
    /// Number of zones whose state was written.
    pub written: usize,
}

impl Evaluation {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Containment test; the boundary counts as inside.
pub fn is_inside(distance_m: f64, threshold_m: u32) -> bool {
    distance_m <= f64::from(threshold_m)
}

pub struct ProximityEngine {
    store: Arc<dyn ProximityStateStore>,
}

impl ProximityEngine {
    pub fn new(store: Arc<dyn ProximityStateStore>) -> Self {
        Self { store }
    }

    /// Evaluate `zones` against `position`.
    ///
    /// `position == None` means no fix this cycle: nothing is read or
    /// written and no zone is treated as outside.
    pub fn evaluate(
        &self,
        position: Option<&Position>,
        zones: &[Zone],
        threshold_m: u32,
        now: u64,
    ) -> Evaluation {
        let mut eval = Evaluation::default();
        let Some(position) = position else {
            debug!("ProximityEngine: no position, state untouched");
            return eval;
        };

        for zone in zones {
            let distance = distance_m(position, &zone.center);
            let inside_now = is_inside(distance, threshold_m);

            let previous = match self.store.get(zone.id) {
                Ok(prev) => prev,
                Err(StateStoreError::Corrupt(id)) => {
                    warn!("ProximityEngine: zone {} record corrupt, treating as unseen", id);
                    None
                }
                Err(e) => {
                    warn!("ProximityEngine: zone {} state read failed: {}", zone.id, e);
                    eval.failures.push((zone.id, e));
                    continue;
                }
            };

            let fires = inside_now && !previous.is_some_and(|p| p.is_inside);

            let record = ProximityState {
                zone_id: zone.id,
                is_inside: inside_now,
                last_checked: now,
            };
            if let Err(e) = self.store.put(&record) {
                warn!("ProximityEngine: zone {} state write failed: {}", zone.id, e);
                eval.failures.push((zone.id, e));
                continue;
            }
            eval.written += 1;

            if fires {
                info!(
                    "ProximityEngine: entered zone {} '{}' ({:.0} m <= {} m)",
                    zone.id,
                    zone.label(),
                    distance,
                    threshold_m
                );
                eval.triggers.push(TriggerEvent {
                    zone: zone.clone(),
                    distance_m: distance,
                });
            } else if previous.map(|p| p.is_inside) != Some(inside_now) {
                debug!(
                    "ProximityEngine: zone {} now {}",
                    zone.id,
                    if inside_now { "inside" } else { "outside" }
                );
            }
        }

        eval
    }

    /// Read the current record for a zone.
    pub fn state(&self, zone_id: ZoneId) -> Result<Option<ProximityState>, StateStoreError> {
        self.store.get(zone_id)
    }

    /// Cascade delete for a removed zone.
    pub fn forget_zone(&self, zone_id: ZoneId) -> Result<(), StateStoreError> {
        self.store.remove(zone_id)?;
        info!("ProximityEngine: forgot zone {}", zone_id);
        Ok(())
    }

    /// Drop every record whose zone is not in `zones`.  Returns how many
    /// records were removed.
    pub fn prune_orphans(&self, zones: &[Zone]) -> Result<usize, StateStoreError> {
        let mut removed = 0;
        for id in self.store.zone_ids()? {
            if !zones.iter().any(|z| z.id == id) {
                self.store.remove(id)?;
                removed += 1;
            }
        }
        if removed > 0 {
            info!("ProximityEngine: pruned {} orphaned record(s)", removed);
        }
        Ok(removed)
    }
}

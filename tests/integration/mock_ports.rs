//! Mock ports and a full wiring harness for integration tests.
//!
//! Sinks record every call so tests can assert on the complete history.
//! Time is virtual: a [`ManualHost`] drives the scheduler and a
//! [`ManualClock`] stamps the state records; the harness moves both.

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use zonewatch::adapters::kv::KvAdapter;
use zonewatch::adapters::location::FixedLocation;
use zonewatch::adapters::manual_host::ManualHost;
use zonewatch::adapters::permission::StaticPermission;
use zonewatch::adapters::proximity_store::KvProximityStore;
use zonewatch::adapters::settings::SharedSettings;
use zonewatch::adapters::time::ManualClock;
use zonewatch::adapters::zone_store::StaticZoneStore;
use zonewatch::app::events::AppEvent;
use zonewatch::app::ports::{ActionSink, EventSink, ProximityStateStore};
use zonewatch::app::service::{CheckPorts, CheckService, DiagnosticsStorage};
use zonewatch::config::{EngineConfig, TrackerConfig};
use zonewatch::geo::Position;
use zonewatch::scheduler::AdaptiveScheduler;
use zonewatch::zone::{Zone, ZoneId};

// 2024-01-01 08:30 UTC, Monday
pub const MONDAY_0830: u64 = 1_704_097_800;

pub fn zurich() -> Position {
    Position::new(47.3769, 8.5417).unwrap()
}

pub fn five_km_north() -> Position {
    Position::new(47.3769 + 0.04497, 8.5417).unwrap()
}

// ── Recording sinks ───────────────────────────────────────────

#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<AppEvent>>,
}

#[allow(dead_code)]
impl RecordingEvents {
    pub fn all(&self) -> Vec<AppEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventSink for RecordingEvents {
    fn emit(&self, event: &AppEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[derive(Default)]
pub struct RecordingActions {
    entered: Mutex<Vec<ZoneId>>,
    /// Simulated work per action, to push a cycle past a host limit.
    pub delay: Mutex<Option<Duration>>,
    /// Runs after each recorded entry, inside the cycle.
    pub on_enter: OnceLock<Box<dyn Fn() + Send + Sync>>,
}

#[allow(dead_code)]
impl RecordingActions {
    pub fn entered(&self) -> Vec<ZoneId> {
        self.entered.lock().unwrap().clone()
    }
}

impl ActionSink for RecordingActions {
    fn on_zone_entered(&self, zone: &Zone) {
        if let Some(d) = *self.delay.lock().unwrap() {
            std::thread::sleep(d);
        }
        self.entered.lock().unwrap().push(zone.id);
        if let Some(hook) = self.on_enter.get() {
            hook();
        }
    }
}

// ── Harness ───────────────────────────────────────────────────

#[allow(dead_code)]
pub struct Harness {
    pub scheduler: Arc<AdaptiveScheduler>,
    pub service: Arc<CheckService>,
    pub host: Arc<ManualHost>,
    pub clock: Arc<ManualClock>,
    pub settings: Arc<SharedSettings>,
    pub zones: Arc<StaticZoneStore>,
    pub location: Arc<FixedLocation>,
    pub permission: Arc<StaticPermission>,
    pub actions: Arc<RecordingActions>,
    pub events: Arc<RecordingEvents>,
    pub kv: Arc<Mutex<KvAdapter>>,
    pub store: Arc<KvProximityStore<KvAdapter>>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(interval_secs: u32) -> Self {
        Self::build(interval_secs, ManualHost::new(Duration::from_secs(900)))
    }

    pub fn with_host(interval_secs: u32, host: ManualHost) -> Self {
        Self::build(interval_secs, host)
    }

    fn build(interval_secs: u32, host: ManualHost) -> Self {
        let clock = Arc::new(ManualClock::new(MONDAY_0830));
        let config = TrackerConfig {
            engine: EngineConfig {
                proximity_threshold_m: 200,
                check_interval_secs: interval_secs,
            },
            ..TrackerConfig::default()
        };
        let settings = Arc::new(SharedSettings::new(config, clock.clone()));
        let zones = Arc::new(StaticZoneStore::new(vec![
            Zone::new(1, zurich()).with_name("Zurich HB"),
        ]));
        let location = Arc::new(FixedLocation::new(Some(zurich())));
        let permission = Arc::new(StaticPermission::new(true));
        let actions = Arc::new(RecordingActions::default());
        let events = Arc::new(RecordingEvents::default());
        let kv = Arc::new(Mutex::new(KvAdapter::new()));
        let store = Arc::new(KvProximityStore::new(kv.clone()));

        let ports = CheckPorts {
            zones: zones.clone(),
            settings: settings.clone(),
            location: location.clone(),
            permission: permission.clone(),
            actions: actions.clone(),
            clock: clock.clone(),
            events: events.clone(),
        };
        let diagnostics: DiagnosticsStorage = kv.clone();
        let service = Arc::new(
            CheckService::new(ports, store.clone()).with_diagnostics(diagnostics),
        );
        let host = Arc::new(host);
        let scheduler = AdaptiveScheduler::new(service.clone(), host.clone());

        Self {
            scheduler,
            service,
            host,
            clock,
            settings,
            zones,
            location,
            permission,
            actions,
            events,
            kv,
            store,
        }
    }

    /// Advance host time and the wall clock together.
    pub fn advance_secs(&self, secs: u64) -> usize {
        let ran = self.host.advance(Duration::from_secs(secs));
        self.clock.advance_secs(secs);
        ran
    }

    pub fn is_inside(&self, zone_id: ZoneId) -> Option<bool> {
        self.store.get(zone_id).unwrap().map(|s| s.is_inside)
    }
}

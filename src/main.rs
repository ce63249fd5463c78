//! Zonewatch host simulation.
//!
//! Wires the engine to in-process adapters and replays a scenario (a JSON
//! file given as the first argument, or the built-in demo walk) on the
//! executor-backed work host.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  StaticZoneStore  SharedSettings  RouteLocation  SystemClock   │
//! │  StaticPermission LogActionSink   LogEventSink   KvAdapter     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │   CheckService · ProximityEngine · FailureLog          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  AdaptiveScheduler ──▶ ExecutorHost ("zonewatch-host" thread)  │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use log::{info, warn};

use zonewatch::adapters::executor_host::ExecutorHost;
use zonewatch::adapters::kv::KvAdapter;
use zonewatch::adapters::location::RouteLocation;
use zonewatch::adapters::log_sink::{LogActionSink, LogEventSink};
use zonewatch::adapters::permission::StaticPermission;
use zonewatch::adapters::proximity_store::KvProximityStore;
use zonewatch::adapters::scenario::Scenario;
use zonewatch::adapters::settings::SharedSettings;
use zonewatch::adapters::time::SystemClock;
use zonewatch::adapters::zone_store::StaticZoneStore;
use zonewatch::app::commands::AppCommand;
use zonewatch::app::ports::ConfigPort;
use zonewatch::app::service::{CheckPorts, CheckService, DiagnosticsStorage};
use zonewatch::scheduler::AdaptiveScheduler;

/// Host-side limit standing in for the platform's background budget.
const MAX_EXECUTION: Duration = Duration::from_secs(600);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Zonewatch v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Scenario ───────────────────────────────────────────
    let scenario = match std::env::args().nth(1) {
        Some(path) => Scenario::load(Path::new(&path))?,
        None => {
            info!("No scenario given, running built-in demo");
            Scenario::demo()?
        }
    };

    // ── 2. Config round-trip through the key-value store ──────
    let kv = Arc::new(Mutex::new(KvAdapter::new()));
    let config = {
        let store = kv.lock().map_err(|_| anyhow!("kv store lock poisoned"))?;
        store.save(&scenario.config)?;
        store.load()?
    };
    info!(
        "Config: threshold={}m interval={}s min_periodic={}s tracking={}",
        config.engine.proximity_threshold_m,
        config.engine.check_interval_secs,
        config.min_periodic_secs,
        config.tracking_enabled
    );

    // ── 3. Adapters ───────────────────────────────────────────
    let clock = Arc::new(SystemClock::utc());
    let settings = Arc::new(SharedSettings::new(config.clone(), clock.clone()));
    let ports = CheckPorts {
        zones: Arc::new(StaticZoneStore::new(scenario.zones.clone())),
        settings,
        location: Arc::new(RouteLocation::new(scenario.route.clone())),
        permission: Arc::new(StaticPermission::new(true)),
        actions: Arc::new(LogActionSink::new()),
        clock,
        events: Arc::new(LogEventSink::new()),
    };
    let diagnostics: DiagnosticsStorage = kv.clone();
    let service = Arc::new(
        CheckService::new(ports, Arc::new(KvProximityStore::new(kv.clone())))
            .with_diagnostics(diagnostics),
    );

    // ── 4. Host + scheduler ───────────────────────────────────
    let host = Arc::new(
        ExecutorHost::start(Duration::from_secs(u64::from(config.min_periodic_secs)))?
            .with_max_execution_time(MAX_EXECUTION),
    );
    let scheduler = AdaptiveScheduler::new(service.clone(), host.clone());

    scheduler.handle_command(AppCommand::RunNow);
    scheduler.handle_command(AppCommand::ScheduleChecks(config.engine.check_interval_secs));

    std::thread::sleep(Duration::from_secs(scenario.run_secs));
    scheduler.handle_command(AppCommand::CancelChecks);

    // ── 5. Report ─────────────────────────────────────────────
    let m = service.metrics();
    info!(
        "Metrics: cycles={} failed={} no_fix={} overlaps={} triggers={}",
        m.cycles_run, m.cycles_failed, m.no_fix_cycles, m.overlaps_skipped, m.triggers
    );
    for entry in service.failure_entries() {
        warn!(
            "Failure log: at={} kind={:?} zone={:?} {}",
            entry.at, entry.kind, entry.zone_id, entry.detail
        );
    }

    drop(scheduler);
    drop(host);
    Ok(())
}

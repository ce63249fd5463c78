//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter           | Implements          | Connects to                   |
//! |-------------------|---------------------|-------------------------------|
//! | `executor_host`   | WorkHost            | edge-executor thread + timers |
//! | `manual_host`     | WorkHost            | virtual time (tests, replay)  |
//! | `kv`              | ConfigPort          | in-memory key-value store     |
//! |                   | StoragePort         |                               |
//! | `proximity_store` | ProximityStateStore | memory / any StoragePort      |
//! | `settings`        | SettingsPort        | live TrackerConfig + clock    |
//! | `location`        | LocationSource      | fixed fix / scripted route    |
//! | `permission`      | PermissionPort      | flag set by the embedding app |
//! | `zone_store`      | ZoneStore           | in-memory zone list           |
//! | `log_sink`        | EventSink           | log output                    |
//! |                   | ActionSink          |                               |
//! | `time`            | ClockPort           | system / manual clock         |
//! | `scenario`        | (none)              | JSON simulation fixture       |

pub mod executor_host;
pub mod kv;
pub mod location;
pub mod log_sink;
pub mod manual_host;
pub mod permission;
pub mod proximity_store;
pub mod scenario;
pub mod settings;
pub mod time;
pub mod zone_store;

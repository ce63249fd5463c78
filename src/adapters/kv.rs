//! Key-value storage adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] on an in-memory
//! map (the simulation backend).  A platform build swaps this for the
//! device's preference store or database without touching the engine.
//!
//! - Config validation: all fields are range-checked before persistence.
//! - Namespace isolation: each subsystem uses its own namespace prefix
//!   (`"zonewatch"` config, `"prox"` proximity state, `"diag"` failures).
//! - Atomic writes: a map insert either happens or does not.

use std::cell::RefCell;
use std::collections::HashMap;

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::{TrackerConfig, validate_config};

const CONFIG_NAMESPACE: &str = "zonewatch";
const CONFIG_KEY: &str = "trkcfg";

pub struct KvAdapter {
    store: RefCell<HashMap<String, Vec<u8>>>,
    /// Fault injection: every write fails with `IoError` while set.
    fail_writes: bool,
}

impl KvAdapter {
    pub fn new() -> Self {
        info!("KvAdapter: simulation backend");
        Self {
            store: RefCell::new(HashMap::new()),
            fail_writes: false,
        }
    }

    /// Make every subsequent write fail (storage unavailable).
    pub fn set_fail_writes(&mut self, fail: bool) {
        if fail {
            warn!("KvAdapter: write fault injection enabled");
        }
        self.fail_writes = fail;
    }

    /// Total number of stored keys across all namespaces.
    pub fn len(&self) -> usize {
        self.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }
}

impl Default for KvAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigPort for KvAdapter {
    fn load(&self) -> Result<TrackerConfig, ConfigError> {
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        if let Some(bytes) = self.store.borrow().get(&key) {
            let cfg: TrackerConfig =
                postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
            validate_config(&cfg)?;
            info!("KvAdapter: loaded config from store");
            Ok(cfg)
        } else {
            info!("KvAdapter: no stored config, using defaults");
            Ok(TrackerConfig::default())
        }
    }

    fn save(&self, config: &TrackerConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        if self.fail_writes {
            return Err(ConfigError::IoError);
        }
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.store.borrow_mut().insert(key, bytes);
        info!("KvAdapter: config saved");
        Ok(())
    }
}

impl StoragePort for KvAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let composite = Self::composite_key(namespace, key);
        match self.store.borrow().get(&composite) {
            Some(data) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        let composite = Self::composite_key(namespace, key);
        self.store.borrow_mut().insert(composite, data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        let composite = Self::composite_key(namespace, key);
        self.store.borrow_mut().remove(&composite);
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        let composite = Self::composite_key(namespace, key);
        self.store.borrow().contains_key(&composite)
    }

    fn keys(&self, namespace: &str) -> Vec<String> {
        let prefix = format!("{}::", namespace);
        self.store
            .borrow()
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_owned))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn default_config_passes_validation() {
        let cfg = TrackerConfig::default();
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn load_without_save_gives_defaults() {
        let kv = KvAdapter::new();
        assert_eq!(kv.load().unwrap(), TrackerConfig::default());
    }

    #[test]
    fn config_save_then_load() {
        let kv = KvAdapter::new();
        let cfg = TrackerConfig {
            engine: EngineConfig {
                proximity_threshold_m: 350,
                check_interval_secs: 1200,
            },
            ..Default::default()
        };
        kv.save(&cfg).unwrap();
        assert_eq!(kv.load().unwrap(), cfg);
    }

    #[test]
    fn save_rejects_invalid_config() {
        let kv = KvAdapter::new();
        let cfg = TrackerConfig {
            min_periodic_secs: 5,
            ..Default::default()
        };
        assert!(matches!(
            kv.save(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
        assert!(kv.is_empty());
    }

    #[test]
    fn corrupted_config_is_reported() {
        let mut kv = KvAdapter::new();
        kv.write(CONFIG_NAMESPACE, CONFIG_KEY, &[0xFF; 3]).unwrap();
        assert!(matches!(kv.load(), Err(ConfigError::Corrupted)));
    }

    #[test]
    fn storage_round_trip() {
        let mut kv = KvAdapter::new();
        let data = b"hello store";
        kv.write("test_ns", "greeting", data).unwrap();
        assert!(kv.exists("test_ns", "greeting"));

        let mut buf = [0u8; 64];
        let len = kv.read("test_ns", "greeting", &mut buf).unwrap();
        assert_eq!(&buf[..len], data);

        kv.delete("test_ns", "greeting").unwrap();
        assert!(!kv.exists("test_ns", "greeting"));
    }

    #[test]
    fn storage_read_missing_key() {
        let kv = KvAdapter::new();
        let mut buf = [0u8; 64];
        assert!(matches!(
            kv.read("ns", "nope", &mut buf),
            Err(StorageError::NotFound)
        ));
    }

    #[test]
    fn namespace_isolation_and_keys() {
        let mut kv = KvAdapter::new();
        kv.write("ns_a", "key", b"alpha").unwrap();
        kv.write("ns_a", "other", b"x").unwrap();
        kv.write("ns_b", "key", b"bravo").unwrap();

        let mut buf = [0u8; 64];
        let len = kv.read("ns_a", "key", &mut buf).unwrap();
        assert_eq!(&buf[..len], b"alpha");
        let len = kv.read("ns_b", "key", &mut buf).unwrap();
        assert_eq!(&buf[..len], b"bravo");

        let mut keys = kv.keys("ns_a");
        keys.sort();
        assert_eq!(keys, vec!["key".to_string(), "other".to_string()]);
    }

    #[test]
    fn injected_write_fault() {
        let mut kv = KvAdapter::new();
        kv.write("ns", "k", b"v").unwrap();
        kv.set_fail_writes(true);
        assert_eq!(kv.write("ns", "k", b"w"), Err(StorageError::IoError));

        let mut buf = [0u8; 8];
        let len = kv.read("ns", "k", &mut buf).unwrap();
        assert_eq!(&buf[..len], b"v", "failed write leaves old value");
    }
}

//! Configuration for the point ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default maximum balance per identity
pub const DEFAULT_CHARGE_LIMIT: u64 = 100_000;

/// Point ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Maximum balance any identity may hold
    pub charge_limit: u64,

    /// Identity lock configuration
    pub lock: LockConfig,

    /// Storage configuration
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "point-core".to_string(),
            charge_limit: DEFAULT_CHARGE_LIMIT,
            lock: LockConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Identity lock configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockConfig {
    /// Bound on lock acquisition; `None` waits indefinitely
    pub acquire_timeout_ms: Option<u64>,
}

impl LockConfig {
    /// Acquire timeout as a duration
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}

/// Which store implementation backs the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps
    Memory,
    /// RocksDB (requires the `rocksdb` feature)
    Rocksdb,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection
    pub backend: StorageBackend,

    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Upper bound of the random delay injected into each in-memory store call
    pub simulated_latency_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data/point"),
            simulated_latency_ms: 0,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(limit) = std::env::var("CHARGE_LIMIT") {
            config.charge_limit = limit.trim().parse().map_err(|_| {
                crate::Error::Config(format!("CHARGE_LIMIT must be an integer, got {:?}", limit))
            })?;
        }

        if let Ok(timeout) = std::env::var("POINT_LOCK_TIMEOUT_MS") {
            let ms = timeout.trim().parse().map_err(|_| {
                crate::Error::Config(format!(
                    "POINT_LOCK_TIMEOUT_MS must be an integer, got {:?}",
                    timeout
                ))
            })?;
            config.lock.acquire_timeout_ms = Some(ms);
        }

        if let Ok(backend) = std::env::var("POINT_STORAGE_BACKEND") {
            config.storage.backend = match backend.trim().to_ascii_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                "rocksdb" => StorageBackend::Rocksdb,
                other => {
                    return Err(crate::Error::Config(format!(
                        "Unknown storage backend: {}",
                        other
                    )))
                }
            };
        }

        if let Ok(data_dir) = std::env::var("POINT_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants the engine relies on
    pub fn validate(&self) -> crate::Result<()> {
        if self.charge_limit == 0 {
            return Err(crate::Error::Config(
                "charge_limit must be greater than zero".to_string(),
            ));
        }
        if self.lock.acquire_timeout_ms == Some(0) {
            return Err(crate::Error::Config(
                "lock.acquire_timeout_ms must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

//! Balance and history stores
//!
//! The engine talks to two collaborators:
//!
//! - [`PointStore`] - current balance per identity. `read` and
//!   `write_balance` are each atomic, but a read followed by a write is not;
//!   callers that need read-modify-write hold the identity lock.
//! - [`HistoryStore`] - append-only mutation log per identity.
//!
//! Backends: [`MemoryStore`] (always available) and `RocksStore`
//! (`rocksdb` feature).

use crate::{
    config::{Config, StorageBackend},
    types::{Amount, PointHistory, TransactionType, UserId, UserPoint},
    Result,
};
use async_trait::async_trait;
use std::sync::Arc;

mod memory;
#[cfg(feature = "rocksdb")]
mod rocks;

pub use memory::MemoryStore;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksStore;

/// Current-balance store
#[async_trait]
pub trait PointStore: Send + Sync {
    /// Balance for `user_id`; zero if the identity was never written
    async fn read(&self, user_id: UserId) -> Result<UserPoint>;

    /// Upsert the balance for `user_id`
    async fn write_balance(&self, user_id: UserId, point: u64) -> Result<UserPoint>;
}

/// Append-only mutation log
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Record one mutation and return the stored entry
    async fn append(
        &self,
        user_id: UserId,
        amount: Amount,
        kind: TransactionType,
        time_millis: i64,
    ) -> Result<PointHistory>;

    /// All entries for `user_id` in insertion order
    async fn read_all(&self, user_id: UserId) -> Result<Vec<PointHistory>>;
}

/// The pair of stores a service runs against
#[derive(Clone)]
pub struct Stores {
    /// Balance store
    pub points: Arc<dyn PointStore>,
    /// History store
    pub history: Arc<dyn HistoryStore>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

impl Stores {
    /// Use one backend for both roles
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: PointStore + HistoryStore + 'static,
    {
        Self {
            points: store.clone(),
            history: store,
        }
    }
}

/// Open the backend selected by `config.storage`
pub fn open_stores(config: &Config) -> Result<Stores> {
    match config.storage.backend {
        StorageBackend::Memory => {
            let store = MemoryStore::with_simulated_latency(std::time::Duration::from_millis(
                config.storage.simulated_latency_ms,
            ));
            Ok(Stores::shared(Arc::new(store)))
        }
        #[cfg(feature = "rocksdb")]
        StorageBackend::Rocksdb => {
            let store = RocksStore::open(&config.storage.data_dir)?;
            Ok(Stores::shared(Arc::new(store)))
        }
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::Rocksdb => Err(crate::Error::Config(
            "rocksdb backend requested but the `rocksdb` feature is disabled".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_backend() {
        let stores = open_stores(&Config::default()).unwrap();
        let id = UserId::new(1).unwrap();
        assert_eq!(stores.points.read(id).await.unwrap().point, 0);
        assert!(stores.history.read_all(id).await.unwrap().is_empty());
    }

    #[cfg(not(feature = "rocksdb"))]
    #[test]
    fn test_rocksdb_backend_requires_feature() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Rocksdb;
        assert!(matches!(open_stores(&config), Err(crate::Error::Config(_))));
    }
}

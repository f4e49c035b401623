//! RocksDB-backed stores
//!
//! # Column Families
//!
//! - `points` - current balance (key: user_id BE)
//! - `history` - mutation log (key: user_id BE || history_id BE)
//!
//! History keys sort by identity first and sequence second, so scanning
//! from the 8-byte identity prefix yields that identity's entries in
//! insertion order.
//!
//! RocksDB calls block, so each one runs on tokio's blocking pool.

use super::{HistoryStore, PointStore};
use crate::{
    error::{Error, Result},
    types::{now_millis, Amount, PointHistory, TransactionType, UserId, UserPoint},
};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, DB};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const CF_POINTS: &str = "points";
const CF_HISTORY: &str = "history";

/// Durable balance and history store
pub struct RocksStore {
    db: Arc<DB>,
    next_history_id: AtomicU64,
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore")
            .field("path", &self.db.path())
            .field("next_history_id", &self.next_history_id)
            .finish()
    }
}

impl RocksStore {
    /// Open or create the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_POINTS, Self::cf_options_points()),
            ColumnFamilyDescriptor::new(CF_HISTORY, Self::cf_options_history()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;
        let last_id = Self::last_history_id(&db)?;
        let store = Self {
            db: Arc::new(db),
            next_history_id: AtomicU64::new(last_id),
        };

        tracing::info!(?path, last_history_id = last_id, "Opened point store");

        Ok(store)
    }

    fn cf_options_points() -> Options {
        let mut opts = Options::default();
        // Balances are read on every mutation
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_history() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    /// Run a RocksDB call on the blocking pool
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&DB) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| Error::Concurrency(format!("RocksDB task failed: {}", e)))?
    }

    fn history_key(user_id: UserId, history_id: u64) -> [u8; 16] {
        let mut key = [0u8; 16];
        key[..8].copy_from_slice(&user_id.get().to_be_bytes());
        key[8..].copy_from_slice(&history_id.to_be_bytes());
        key
    }

    /// Highest history id on disk.
    ///
    /// Ids are global but keys sort by identity first, so the whole family
    /// is scanned once at open.
    fn last_history_id(db: &DB) -> Result<u64> {
        let cf = cf_handle(db, CF_HISTORY)?;
        let mut last = 0u64;
        for item in db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item?;
            if key.len() == 16 {
                let mut id = [0u8; 8];
                id.copy_from_slice(&key[8..]);
                last = last.max(u64::from_be_bytes(id));
            }
        }
        Ok(last)
    }
}

fn cf_handle<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
}

#[async_trait]
impl PointStore for RocksStore {
    async fn read(&self, user_id: UserId) -> Result<UserPoint> {
        self.blocking(move |db| {
            let cf = cf_handle(db, CF_POINTS)?;
            match db.get_cf(cf, user_id.get().to_be_bytes())? {
                Some(value) => Ok(bincode::deserialize(&value)?),
                None => Ok(UserPoint::empty(user_id, now_millis())),
            }
        })
        .await
    }

    async fn write_balance(&self, user_id: UserId, point: u64) -> Result<UserPoint> {
        let record = UserPoint {
            id: user_id,
            point,
            update_millis: now_millis(),
        };
        self.blocking(move |db| {
            let cf = cf_handle(db, CF_POINTS)?;
            db.put_cf(cf, user_id.get().to_be_bytes(), bincode::serialize(&record)?)?;
            Ok(record)
        })
        .await
    }
}

#[async_trait]
impl HistoryStore for RocksStore {
    async fn append(
        &self,
        user_id: UserId,
        amount: Amount,
        kind: TransactionType,
        time_millis: i64,
    ) -> Result<PointHistory> {
        let entry = PointHistory {
            id: self.next_history_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            amount,
            kind,
            time_millis,
        };
        let entry = self
            .blocking(move |db| {
                let cf = cf_handle(db, CF_HISTORY)?;
                db.put_cf(
                    cf,
                    RocksStore::history_key(user_id, entry.id),
                    bincode::serialize(&entry)?,
                )?;
                Ok(entry)
            })
            .await?;

        tracing::debug!(user_id = %user_id, history_id = entry.id, "History appended");

        Ok(entry)
    }

    async fn read_all(&self, user_id: UserId) -> Result<Vec<PointHistory>> {
        self.blocking(move |db| {
            let cf = cf_handle(db, CF_HISTORY)?;
            let prefix = user_id.get().to_be_bytes();

            let mut entries = Vec::new();
            for item in db.iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward)) {
                let (key, value) = item?;
                if !key.starts_with(&prefix) {
                    break;
                }
                entries.push(bincode::deserialize(&value)?);
            }
            Ok(entries)
        })
        .await
    }
}

//! In-memory stores

use super::{HistoryStore, PointStore};
use crate::{
    types::{now_millis, Amount, PointHistory, TransactionType, UserId, UserPoint},
    Result,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Process-local balance and history maps.
///
/// With a non-zero simulated latency every call sleeps for a random duration
/// up to that bound before touching the maps, so a read and a following
/// write from two callers can interleave the way they would against a remote
/// store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    points: RwLock<HashMap<UserId, UserPoint>>,
    history: RwLock<HashMap<UserId, Vec<PointHistory>>>,
    next_history_id: AtomicU64,
    max_latency: Duration,
}

impl MemoryStore {
    /// Store that answers immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that delays each call by up to `max_latency`
    pub fn with_simulated_latency(max_latency: Duration) -> Self {
        Self {
            max_latency,
            ..Self::default()
        }
    }

    async fn simulate_latency(&self) {
        if self.max_latency.is_zero() {
            return;
        }
        let max_us = self.max_latency.as_micros() as u64;
        let delay = rand::thread_rng().gen_range(0..=max_us);
        tokio::time::sleep(Duration::from_micros(delay)).await;
    }

    /// Total history entries across all identities
    pub fn history_len(&self) -> usize {
        self.history.read().values().map(Vec::len).sum()
    }
}

#[async_trait]
impl PointStore for MemoryStore {
    async fn read(&self, user_id: UserId) -> Result<UserPoint> {
        self.simulate_latency().await;
        let point = self
            .points
            .read()
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| UserPoint::empty(user_id, now_millis()));
        Ok(point)
    }

    async fn write_balance(&self, user_id: UserId, point: u64) -> Result<UserPoint> {
        self.simulate_latency().await;
        let record = UserPoint {
            id: user_id,
            point,
            update_millis: now_millis(),
        };
        self.points.write().insert(user_id, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn append(
        &self,
        user_id: UserId,
        amount: Amount,
        kind: TransactionType,
        time_millis: i64,
    ) -> Result<PointHistory> {
        self.simulate_latency().await;
        let entry = PointHistory {
            id: self.next_history_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            amount,
            kind,
            time_millis,
        };
        self.history
            .write()
            .entry(user_id)
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    async fn read_all(&self, user_id: UserId) -> Result<Vec<PointHistory>> {
        self.simulate_latency().await;
        Ok(self
            .history
            .read()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(id: u64) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_unseen_identity_reads_zero() {
        let store = MemoryStore::new();
        let point = store.read(uid(10)).await.unwrap();
        assert_eq!(point.id, uid(10));
        assert_eq!(point.point, 0);
    }

    #[tokio::test]
    async fn test_write_balance_upserts() {
        let store = MemoryStore::new();
        store.write_balance(uid(1), 300).await.unwrap();
        store.write_balance(uid(1), 120).await.unwrap();
        assert_eq!(store.read(uid(1)).await.unwrap().point, 120);
    }

    #[tokio::test]
    async fn test_history_is_per_identity_and_ordered() {
        let store = MemoryStore::new();
        let ten = Amount::new(10).unwrap();
        let five = Amount::new(5).unwrap();

        store.append(uid(1), ten, TransactionType::Charge, 1).await.unwrap();
        store.append(uid(2), ten, TransactionType::Charge, 2).await.unwrap();
        store.append(uid(1), five, TransactionType::Use, 3).await.unwrap();

        let history = store.read_all(uid(1)).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, TransactionType::Charge);
        assert_eq!(history[1].kind, TransactionType::Use);
        assert!(history[0].id < history[1].id);
        assert_eq!(store.history_len(), 3);
    }

    #[tokio::test]
    async fn test_simulated_latency_still_answers() {
        let store = MemoryStore::with_simulated_latency(Duration::from_millis(2));
        store.write_balance(uid(4), 9).await.unwrap();
        assert_eq!(store.read(uid(4)).await.unwrap().point, 9);
    }
}

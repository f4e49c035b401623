//! Balance mutation engine
//!
//! Charges and uses run the same critical section under the identity lock:
//!
//! ```text
//! validate ─▶ acquire(user) ─▶ read ─▶ compute ─▶ bound check ─▶ write ─▶ append ─▶ release
//!                                                     │
//!                                                     └─▶ reject (nothing written)
//! ```
//!
//! The store offers no compare-and-swap, so two unlocked charges could both
//! read the same balance and one of them would be lost. Locks are per
//! identity; unrelated identities never wait on each other. Reads skip the
//! lock and see whatever the store holds at call time.
//!
//! # Example
//!
//! ```no_run
//! use point_core::{Config, PointService};
//!
//! #[tokio::main]
//! async fn main() -> point_core::Result<()> {
//!     let service = PointService::open(&Config::default())?;
//!
//!     service.charge_point(1, 500).await?;
//!     let point = service.use_point(1, 200).await?;
//!     assert_eq!(point.point, 300);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    lock::LockRegistry,
    metrics::Metrics,
    storage::{open_stores, Stores},
    types::{now_millis, Amount, PointHistory, TransactionType, UserId, UserPoint},
    validation::{validate_amount, validate_user_id},
    Config, Error, Result,
};
use std::sync::Arc;

/// Point service: balance reads, history reads and locked mutations
#[derive(Debug)]
pub struct PointService {
    /// Balance and history collaborators
    stores: Stores,

    /// Identity lock tokens
    locks: Arc<LockRegistry>,

    /// Runs critical sections on their own tasks
    mutator: Mutator,

    /// Mutation metrics
    metrics: Metrics,
}

impl PointService {
    /// Open the configured stores and build a service over them
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let stores = open_stores(config)?;
        let locks = match config.lock.acquire_timeout() {
            Some(timeout) => LockRegistry::with_timeout(timeout),
            None => LockRegistry::new(),
        };
        Self::new(config, stores, Arc::new(locks))
    }

    /// Build a service over injected stores and lock registry
    pub fn new(config: &Config, stores: Stores, locks: Arc<LockRegistry>) -> Result<Self> {
        config.validate()?;
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to register metrics: {}", e)))?;

        tracing::info!(
            service = %config.service_name,
            charge_limit = config.charge_limit,
            lock_timeout = ?locks.acquire_timeout(),
            "Point service ready"
        );

        let mutator = Mutator {
            stores: stores.clone(),
            locks: locks.clone(),
            charge_limit: config.charge_limit,
            metrics: metrics.clone(),
        };

        Ok(Self {
            stores,
            locks,
            mutator,
            metrics,
        })
    }

    /// Maximum balance any identity may hold
    pub fn charge_limit(&self) -> u64 {
        self.mutator.charge_limit
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Identity lock registry
    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    /// Current balance. Not linearized with in-flight mutations.
    pub async fn get_point(&self, user_id: i64) -> Result<UserPoint> {
        let user_id = validate_user_id(user_id)?;
        self.stores.points.read(user_id).await
    }

    /// Mutation history in insertion order
    pub async fn get_history(&self, user_id: i64) -> Result<Vec<PointHistory>> {
        let user_id = validate_user_id(user_id)?;
        self.stores.history.read_all(user_id).await
    }

    /// Add `amount` to the balance.
    ///
    /// Fails with [`Error::LimitExceeded`] if the result would exceed the
    /// charge limit; the balance is left untouched in that case.
    pub async fn charge_point(&self, user_id: i64, amount: i64) -> Result<UserPoint> {
        let (user_id, amount) = self.validate_request(user_id, amount, TransactionType::Charge)?;
        self.apply(user_id, amount, TransactionType::Charge).await
    }

    /// Subtract `amount` from the balance.
    ///
    /// Fails with [`Error::InsufficientBalance`] if the balance would go
    /// negative; the balance is left untouched in that case.
    pub async fn use_point(&self, user_id: i64, amount: i64) -> Result<UserPoint> {
        let (user_id, amount) = self.validate_request(user_id, amount, TransactionType::Use)?;
        self.apply(user_id, amount, TransactionType::Use).await
    }

    /// Run one mutation for already-validated input.
    ///
    /// The critical section runs on a spawned task. Dropping the returned
    /// future stops the wait, not the mutation: once started, the balance
    /// write and its history entry land together or not at all.
    pub async fn apply(
        &self,
        user_id: UserId,
        amount: Amount,
        kind: TransactionType,
    ) -> Result<UserPoint> {
        let mutator = self.mutator.clone();
        tokio::spawn(async move { mutator.run(user_id, amount, kind).await })
            .await
            .map_err(|e| {
                Error::Concurrency(format!("Mutation task for user {} failed: {}", user_id, e))
            })?
    }

    fn validate_request(
        &self,
        user_id: i64,
        amount: i64,
        kind: TransactionType,
    ) -> Result<(UserId, Amount)> {
        let validated = validate_user_id(user_id)
            .and_then(|user_id| Ok((user_id, validate_amount(amount)?)));

        if let Err(e) = &validated {
            self.metrics.record_rejection(e.kind());
            tracing::warn!(user_id, amount, %kind, error = %e, "Point request invalid");
        }

        validated
    }
}

/// Owned handles for one critical section, cheap to clone into a task
#[derive(Debug, Clone)]
struct Mutator {
    stores: Stores,
    locks: Arc<LockRegistry>,
    charge_limit: u64,
    metrics: Metrics,
}

impl Mutator {
    async fn run(&self, user_id: UserId, amount: Amount, kind: TransactionType) -> Result<UserPoint> {
        let result = self.apply_locked(user_id, amount, kind).await;

        match &result {
            Ok(point) => {
                self.metrics.record_commit(kind);
                tracing::info!(
                    user_id = %user_id,
                    %kind,
                    amount = amount.get(),
                    balance = point.point,
                    "Point mutation committed"
                );
            }
            Err(e) if e.is_business_rule() => {
                self.metrics.record_rejection(e.kind());
                tracing::warn!(
                    user_id = %user_id,
                    %kind,
                    amount = amount.get(),
                    error = %e,
                    "Point mutation rejected"
                );
            }
            Err(e) => {
                self.metrics.record_failure(e.kind());
                tracing::error!(
                    user_id = %user_id,
                    %kind,
                    amount = amount.get(),
                    error = %e,
                    "Point mutation failed"
                );
            }
        }

        result
    }

    /// Critical section. Every early return drops the guard, which hands the
    /// identity to the next waiter.
    async fn apply_locked(
        &self,
        user_id: UserId,
        amount: Amount,
        kind: TransactionType,
    ) -> Result<UserPoint> {
        let guard = self.locks.acquire(user_id).await?;
        self.metrics.record_lock_wait(guard.waited());
        self.metrics
            .set_tracked_identities(self.locks.tracked_identities());

        let current = self.stores.points.read(user_id).await?;
        let candidate = next_balance(current.point, amount, kind, self.charge_limit)?;

        let updated = self.stores.points.write_balance(user_id, candidate).await?;

        if let Err(e) = self
            .stores
            .history
            .append(user_id, amount, kind, now_millis())
            .await
        {
            self.restore_balance(user_id, current.point, &e).await;
            return Err(e);
        }

        guard.release();
        Ok(updated)
    }

    /// Put the pre-mutation balance back after a failed history append, so
    /// the balance never moves without a matching entry. Still under the
    /// identity lock.
    async fn restore_balance(&self, user_id: UserId, previous: u64, cause: &Error) {
        match self.stores.points.write_balance(user_id, previous).await {
            Ok(_) => tracing::warn!(
                user_id = %user_id,
                balance = previous,
                cause = %cause,
                "History append failed, balance restored"
            ),
            Err(e) => tracing::error!(
                user_id = %user_id,
                balance = previous,
                cause = %cause,
                error = %e,
                "History append failed and balance could not be restored"
            ),
        }
    }
}

/// Balance after applying `amount`, or the business-rule failure
fn next_balance(current: u64, amount: Amount, kind: TransactionType, limit: u64) -> Result<u64> {
    match kind {
        TransactionType::Charge => current
            .checked_add(amount.get())
            .filter(|candidate| *candidate <= limit)
            .ok_or(Error::LimitExceeded { limit }),
        TransactionType::Use => {
            current
                .checked_sub(amount.get())
                .ok_or(Error::InsufficientBalance {
                    balance: current,
                    requested: amount.get(),
                })
        }
    }
}

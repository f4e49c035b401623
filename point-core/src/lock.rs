//! Per-identity exclusive locks
//!
//! Every identity gets one `tokio::sync::Mutex<()>` the first time a mutation
//! touches it. Tokens are never removed, so a guard can never refer to a
//! token that a concurrent caller has replaced.
//!
//! ```text
//!   charge(7) ─┐                    ┌─ use(9)
//!              ▼                    ▼
//!   ┌────────────────────────────────────────┐
//!   │ DashMap<UserId, Arc<Mutex<()>>>        │  insert-if-absent only
//!   └───────┬───────────────────────┬────────┘
//!           ▼                       ▼
//!      token(7)                 token(9)      independent, FIFO waiters
//! ```

use crate::types::UserId;
use crate::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of identity lock tokens
#[derive(Debug, Default)]
pub struct LockRegistry {
    tokens: DashMap<UserId, Arc<Mutex<()>>>,
    acquire_timeout: Option<Duration>,
}

impl LockRegistry {
    /// Registry that waits indefinitely for contended identities
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that gives up after `timeout` with [`Error::LockTimeout`]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            acquire_timeout: Some(timeout),
        }
    }

    /// Token for `user_id`, created on first sight.
    ///
    /// The shard lock taken by `entry` is held only for the insert, never
    /// while waiting on the token itself.
    fn token(&self, user_id: UserId) -> Arc<Mutex<()>> {
        self.tokens
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Wait for exclusive access to `user_id`
    pub async fn acquire(&self, user_id: UserId) -> Result<IdentityGuard> {
        let token = self.token(user_id);
        let started = Instant::now();

        let guard = match self.acquire_timeout {
            Some(timeout) => tokio::time::timeout(timeout, token.lock_owned())
                .await
                .map_err(|_| {
                    tracing::warn!(user_id = %user_id, ?timeout, "identity lock acquisition timed out");
                    Error::LockTimeout {
                        user_id: user_id.get(),
                        waited_ms: started.elapsed().as_millis() as u64,
                    }
                })?,
            None => token.lock_owned().await,
        };

        let waited = started.elapsed();
        tracing::debug!(user_id = %user_id, waited_us = waited.as_micros() as u64, "identity lock acquired");

        Ok(IdentityGuard {
            user_id,
            waited,
            _guard: guard,
        })
    }

    /// Number of identities that own a token
    pub fn tracked_identities(&self) -> usize {
        self.tokens.len()
    }

    /// Configured acquisition bound
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout
    }
}

/// Exclusive access to one identity, released on drop
#[derive(Debug)]
#[must_use = "the identity is unlocked as soon as the guard is dropped"]
pub struct IdentityGuard {
    user_id: UserId,
    waited: Duration,
    _guard: OwnedMutexGuard<()>,
}

impl IdentityGuard {
    /// Identity this guard protects
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Time spent waiting for the lock
    pub fn waited(&self) -> Duration {
        self.waited
    }

    /// Hand the identity to the next waiter
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for IdentityGuard {
    fn drop(&mut self) {
        tracing::debug!(user_id = %self.user_id, "identity lock released");
    }
}

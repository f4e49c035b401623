//! Point Ledger Core
//!
//! Per-identity point balances with an append-only mutation history.
//!
//! # Architecture
//!
//! - **Identity locks**: one exclusive token per identity, created lazily
//! - **Mutation engine**: read, bound-check, write and append under the lock
//! - **Pluggable stores**: balance and history stores behind async traits
//!
//! # Invariants
//!
//! - `0 <= balance <= charge_limit` after every successful mutation
//! - Exactly one history entry per successful mutation, none on failure
//! - Mutations on one identity are serialized; identities are independent

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod validation;
pub mod storage;
pub mod lock;
pub mod engine;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{Amount, PointHistory, TransactionType, UserId, UserPoint};
pub use storage::{HistoryStore, MemoryStore, PointStore, Stores};
pub use lock::{IdentityGuard, LockRegistry};
pub use engine::PointService;
pub use config::Config;

//! Error types for the point ledger

use thiserror::Error;

/// Result type for point operations
pub type Result<T> = std::result::Result<T, Error>;

/// Point ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Identity is not a positive integer
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Amount is not a positive integer
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Charge would push the balance above the configured maximum
    #[error("Charge limit exceeded: balance may not exceed {limit}")]
    LimitExceeded {
        /// Configured charge limit
        limit: u64,
    },

    /// Use would drive the balance below zero
    #[error("Insufficient balance: {balance} available, {requested} requested")]
    InsufficientBalance {
        /// Balance at the time of the attempt
        balance: u64,
        /// Amount the caller tried to use
        requested: u64,
    },

    /// Identity lock could not be acquired within the configured bound
    #[error("Timed out after {waited_ms}ms waiting for lock on user {user_id}")]
    LockTimeout {
        /// Identity whose lock was contended
        user_id: u64,
        /// How long the caller waited
        waited_ms: u64,
    },

    /// Mutation task or blocking store call did not complete
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for validation and business-rule rejections.
    ///
    /// These are deterministic for a given balance and input; infrastructure
    /// faults (storage, IO, lock timeouts, task failures) return `false`.
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            Error::InvalidIdentity(_)
                | Error::InvalidAmount(_)
                | Error::LimitExceeded { .. }
                | Error::InsufficientBalance { .. }
        )
    }

    /// Short stable label, used as a metrics dimension
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidIdentity(_) => "invalid_identity",
            Error::InvalidAmount(_) => "invalid_amount",
            Error::LimitExceeded { .. } => "limit_exceeded",
            Error::InsufficientBalance { .. } => "insufficient_balance",
            Error::LockTimeout { .. } => "lock_timeout",
            Error::Concurrency(_) => "concurrency",
            Error::Storage(_) => "storage",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }
}

#[cfg(feature = "rocksdb")]
impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_rule_classification() {
        assert!(Error::LimitExceeded { limit: 100 }.is_business_rule());
        assert!(Error::InsufficientBalance { balance: 0, requested: 1 }.is_business_rule());
        assert!(Error::InvalidIdentity("-1".into()).is_business_rule());
        assert!(!Error::Storage("disk full".into()).is_business_rule());
        assert!(!Error::LockTimeout { user_id: 1, waited_ms: 5 }.is_business_rule());
    }

    #[test]
    fn test_limit_message_carries_limit() {
        let err = Error::LimitExceeded { limit: 100_000 };
        assert!(err.to_string().contains("100000"));
        assert_eq!(err.kind(), "limit_exceeded");
    }
}

//! Core types for the point ledger
//!
//! Identities and amounts wrap `NonZeroU64`, so a value of either type is
//! a positive integer by construction. Raw inputs go through
//! [`crate::validation`] to obtain one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;

/// Account identity (positive integer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(NonZeroU64);

impl UserId {
    /// Create from a raw value, `None` for zero
    pub fn new(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(Self)
    }

    /// Get raw value
    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Positive point amount for a charge or use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(NonZeroU64);

impl Amount {
    /// Create from a raw value, `None` for zero
    pub fn new(amount: u64) -> Option<Self> {
        NonZeroU64::new(amount).map(Self)
    }

    /// Get raw value
    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current balance of one identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPoint {
    /// Owner
    pub id: UserId,

    /// Balance, always within `0..=charge_limit`
    pub point: u64,

    /// Last update (milliseconds since Unix epoch)
    pub update_millis: i64,
}

impl UserPoint {
    /// Zero balance, returned for identities the store has never seen
    pub fn empty(id: UserId, now_millis: i64) -> Self {
        Self {
            id,
            point: 0,
            update_millis: now_millis,
        }
    }
}

/// Kind of balance mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionType {
    /// Balance increased
    Charge = 1,
    /// Balance decreased
    Use = 2,
}

impl TransactionType {
    /// Lowercase label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Charge => "charge",
            TransactionType::Use => "use",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one successful mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointHistory {
    /// Store-assigned sequence number, strictly increasing per store
    pub id: u64,

    /// Identity whose balance changed
    pub user_id: UserId,

    /// Amount charged or used
    pub amount: Amount,

    /// Direction of the change
    pub kind: TransactionType,

    /// When the mutation committed (milliseconds since Unix epoch)
    pub time_millis: i64,
}

/// Milliseconds since Unix epoch, the timestamp unit used by both stores
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_not_an_identity() {
        assert!(UserId::new(0).is_none());
        assert_eq!(UserId::new(7).map(|id| id.get()), Some(7));
    }

    #[test]
    fn test_zero_is_not_an_amount() {
        assert!(Amount::new(0).is_none());
        assert_eq!(Amount::new(1).unwrap().to_string(), "1");
    }

    #[test]
    fn test_empty_point() {
        let id = UserId::new(3).unwrap();
        let point = UserPoint::empty(id, 42);
        assert_eq!(point.point, 0);
        assert_eq!(point.update_millis, 42);
    }

    #[test]
    fn test_transaction_type_labels() {
        assert_eq!(TransactionType::Charge.to_string(), "charge");
        assert_eq!(TransactionType::Use.as_str(), "use");
    }
}

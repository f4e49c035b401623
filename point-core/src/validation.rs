//! Input validation
//!
//! Callers above this crate decode identities and amounts as signed
//! integers (or raw text). Everything is checked here before the engine
//! touches a lock or a store.

use crate::types::{Amount, UserId};
use crate::{Error, Result};

/// Validate a raw identity
pub fn validate_user_id(raw: i64) -> Result<UserId> {
    u64::try_from(raw)
        .ok()
        .and_then(UserId::new)
        .ok_or_else(|| Error::InvalidIdentity(format!("{} is not a positive integer", raw)))
}

/// Validate a raw amount
pub fn validate_amount(raw: i64) -> Result<Amount> {
    u64::try_from(raw)
        .ok()
        .and_then(Amount::new)
        .ok_or_else(|| Error::InvalidAmount(format!("{} is not a positive integer", raw)))
}

/// Parse an identity from text, rejecting fractions and garbage
pub fn parse_user_id(raw: &str) -> Result<UserId> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::InvalidIdentity(format!("{:?} is not an integer", raw)))?;
    validate_user_id(value)
}

/// Parse an amount from text, rejecting fractions and garbage
pub fn parse_amount(raw: &str) -> Result<Amount> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::InvalidAmount(format!("{:?} is not an integer", raw)))?;
    validate_amount(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_identity_accepted() {
        assert_eq!(validate_user_id(1).unwrap().get(), 1);
        assert_eq!(validate_user_id(i64::MAX).unwrap().get(), i64::MAX as u64);
    }

    #[test]
    fn test_non_positive_identity_rejected() {
        for raw in [0, -1, i64::MIN] {
            assert!(matches!(validate_user_id(raw), Err(Error::InvalidIdentity(_))));
        }
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        assert!(matches!(validate_amount(0), Err(Error::InvalidAmount(_))));
        assert!(matches!(validate_amount(-500), Err(Error::InvalidAmount(_))));
        assert_eq!(validate_amount(500).unwrap().get(), 500);
    }

    #[test]
    fn test_parse_rejects_non_integers() {
        assert!(matches!(parse_user_id("1.5"), Err(Error::InvalidIdentity(_))));
        assert!(matches!(parse_user_id("abc"), Err(Error::InvalidIdentity(_))));
        assert!(matches!(parse_amount("10.0"), Err(Error::InvalidAmount(_))));
        assert!(matches!(parse_amount(""), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_parse_accepts_padded_integers() {
        assert_eq!(parse_user_id(" 42 ").unwrap().get(), 42);
        assert_eq!(parse_amount("1000").unwrap().get(), 1000);
    }
}

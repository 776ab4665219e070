//! Request-shape validation. These checks run before any lock is taken or
//! any ledger entry is written; a request that fails here leaves no trace.

use std::fmt;

pub const ACCOUNT_NUMBER_LEN: usize = 10;
pub const TRANSACTION_ID_LEN: usize = 32;
pub const MIN_USE_AMOUNT: i64 = 10;
pub const MAX_USE_AMOUNT: i64 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn validate_account_number(number: &str) -> ValidationResult {
    if number.len() != ACCOUNT_NUMBER_LEN || !number.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(
            "account_number",
            format!("must be exactly {} digits", ACCOUNT_NUMBER_LEN),
        ));
    }

    Ok(())
}

pub fn validate_use_amount(amount: i64) -> ValidationResult {
    if !(MIN_USE_AMOUNT..=MAX_USE_AMOUNT).contains(&amount) {
        return Err(ValidationError::new(
            "amount",
            format!(
                "must be between {} and {}",
                MIN_USE_AMOUNT, MAX_USE_AMOUNT
            ),
        ));
    }

    Ok(())
}

pub fn validate_positive_amount(amount: i64) -> ValidationResult {
    if amount <= 0 {
        return Err(ValidationError::new("amount", "must be greater than zero"));
    }

    Ok(())
}

pub fn validate_transaction_id(transaction_id: &str) -> ValidationResult {
    if transaction_id.len() != TRANSACTION_ID_LEN
        || !transaction_id
            .chars()
            .all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase())
    {
        return Err(ValidationError::new(
            "transaction_id",
            format!("must be {} lowercase hex characters", TRANSACTION_ID_LEN),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_account_number() {
        assert!(validate_account_number("1234567890").is_ok());
        assert!(validate_account_number("123456789").is_err());
        assert!(validate_account_number("12345678901").is_err());
        assert!(validate_account_number("12345678a0").is_err());
        assert!(validate_account_number("").is_err());
    }

    #[test]
    fn validates_use_amount_bounds() {
        assert!(validate_use_amount(10).is_ok());
        assert!(validate_use_amount(1_000_000_000).is_ok());
        assert!(validate_use_amount(9).is_err());
        assert!(validate_use_amount(1_000_000_001).is_err());
        assert!(validate_use_amount(-5).is_err());
    }

    #[test]
    fn validates_positive_amount() {
        assert!(validate_positive_amount(1).is_ok());
        assert!(validate_positive_amount(0).is_err());
        assert!(validate_positive_amount(-1).is_err());
    }

    #[test]
    fn validates_transaction_id_shape() {
        assert!(validate_transaction_id(&"a1".repeat(16)).is_ok());
        assert!(validate_transaction_id(&"A1".repeat(16)).is_err());
        assert!(validate_transaction_id("abc123").is_err());
        assert!(validate_transaction_id(&"g1".repeat(16)).is_err());
    }
}

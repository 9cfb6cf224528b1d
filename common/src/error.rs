//! Error types for Tally balance operations.

use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for Tally operations.
///
/// Every variant is an expected validation outcome rather than a fault: it
/// is reported to the immediate caller and never retried inside the core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TallyError {
    /// Amount is zero or negative, the transfer targets its own source,
    /// or a transfer had to be compensated.
    #[error("Invalid amount: ${amount:.2}. {reason}")]
    InvalidAmount { amount: Decimal, reason: String },

    /// Savings withdrawal would drop below the minimum balance.
    #[error(
        "Insufficient funds: Current balance is ${balance:.2}, but withdrawal of \
         ${requested:.2} was requested. {policy}"
    )]
    InsufficientFunds {
        balance: Decimal,
        requested: Decimal,
        policy: String,
    },

    /// Checking withdrawal would go past the overdraft limit.
    #[error(
        "Overdraft limit exceeded: Current balance is ${balance:.2}, overdraft limit is \
         ${overdraft_limit:.2}, but withdrawal of ${requested:.2} would exceed the limit."
    )]
    OverdraftExceeded {
        balance: Decimal,
        requested: Decimal,
        overdraft_limit: Decimal,
    },

    /// Account number is empty or does not resolve.
    #[error("Invalid account: Account number '{0}' not found.")]
    InvalidAccount(String),
}

impl TallyError {
    /// Amount rejected because it is not strictly positive.
    pub fn non_positive(amount: Decimal) -> Self {
        TallyError::InvalidAmount {
            amount,
            reason: "Amount must be greater than zero.".to_string(),
        }
    }

    /// Amount rejected for a caller-supplied reason.
    pub fn invalid_amount(amount: Decimal, reason: impl Into<String>) -> Self {
        TallyError::InvalidAmount {
            amount,
            reason: reason.into(),
        }
    }

    /// True for the two withdrawal-policy (floor) rejections.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            TallyError::InsufficientFunds { .. } | TallyError::OverdraftExceeded { .. }
        )
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            TallyError::InvalidAmount { .. } => "INVALID_AMOUNT",
            TallyError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TallyError::OverdraftExceeded { .. } => "OVERDRAFT_EXCEEDED",
            TallyError::InvalidAccount(_) => "INVALID_ACCOUNT",
        }
    }
}

/// Result type alias for Tally operations.
pub type Result<T> = std::result::Result<T, TallyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_details() {
        let err = TallyError::OverdraftExceeded {
            balance: Decimal::from(-1000),
            requested: Decimal::from(1),
            overdraft_limit: Decimal::from(1000),
        };
        let message = err.to_string();
        assert!(message.contains("-1000.00"));
        assert!(message.contains("overdraft limit is $1000.00"));

        let err = TallyError::InvalidAccount("ACC999".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid account: Account number 'ACC999' not found."
        );
    }

    #[test]
    fn test_policy_rejection() {
        let insufficient = TallyError::InsufficientFunds {
            balance: Decimal::from(1000),
            requested: Decimal::from(600),
            policy: "The minimum balance should be $500".to_string(),
        };
        assert!(insufficient.is_policy_rejection());
        assert_eq!(insufficient.error_code(), "INSUFFICIENT_FUNDS");

        let invalid = TallyError::non_positive(Decimal::ZERO);
        assert!(!invalid.is_policy_rejection());
        assert_eq!(invalid.error_code(), "INVALID_AMOUNT");
    }
}

//! Account kinds and their withdrawal floors.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tally_common::{Result, TallyError};

/// Default Savings minimum balance.
pub const DEFAULT_MINIMUM_BALANCE: i64 = 500;

/// Default Checking overdraft limit.
pub const DEFAULT_OVERDRAFT_LIMIT: i64 = 1000;

/// Withdrawal policy of an account.
///
/// Each kind defines a floor that the balance may never drop below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    /// Balance must stay at or above `minimum_balance`.
    Savings { minimum_balance: Decimal },
    /// Balance must stay at or above `-overdraft_limit`.
    Checking { overdraft_limit: Decimal },
}

impl AccountKind {
    /// Savings account with the given minimum balance.
    pub fn savings(minimum_balance: Decimal) -> Self {
        AccountKind::Savings { minimum_balance }
    }

    /// Checking account with the given overdraft limit.
    pub fn checking(overdraft_limit: Decimal) -> Self {
        AccountKind::Checking { overdraft_limit }
    }

    /// Savings account with the default minimum balance of 500.
    pub fn default_savings() -> Self {
        Self::savings(Decimal::from(DEFAULT_MINIMUM_BALANCE))
    }

    /// Checking account with the default overdraft limit of 1000.
    pub fn default_checking() -> Self {
        Self::checking(Decimal::from(DEFAULT_OVERDRAFT_LIMIT))
    }

    /// Lowest balance this kind permits.
    pub fn floor(&self) -> Decimal {
        match self {
            AccountKind::Savings { minimum_balance } => *minimum_balance,
            AccountKind::Checking { overdraft_limit } => -*overdraft_limit,
        }
    }

    /// Check whether a balance satisfies the floor.
    pub fn permits(&self, balance: Decimal) -> bool {
        balance >= self.floor()
    }

    /// Refuse an opening balance below the floor.
    pub fn check_opening(&self, initial_balance: Decimal) -> Result<()> {
        if self.permits(initial_balance) {
            return Ok(());
        }

        Err(TallyError::invalid_amount(
            initial_balance,
            format!(
                "Initial balance is below the {} floor of ${}.",
                self.name(),
                self.floor()
            ),
        ))
    }

    /// Apply the floor check to a withdrawal of `amount` from `balance`.
    /// Returns the resulting balance. `amount` is assumed positive.
    ///
    /// A difference too large to represent is below any floor and is refused
    /// with the kind's policy error.
    pub fn check_withdrawal(&self, balance: Decimal, amount: Decimal) -> Result<Decimal> {
        match balance.checked_sub(amount) {
            Some(new_balance) if self.permits(new_balance) => Ok(new_balance),
            _ => Err(self.refusal(balance, amount)),
        }
    }

    fn refusal(&self, balance: Decimal, amount: Decimal) -> TallyError {
        match self {
            AccountKind::Savings { minimum_balance } => TallyError::InsufficientFunds {
                balance,
                requested: amount,
                policy: format!("The minimum balance should be ${}", minimum_balance),
            },
            AccountKind::Checking { overdraft_limit } => TallyError::OverdraftExceeded {
                balance,
                requested: amount,
                overdraft_limit: *overdraft_limit,
            },
        }
    }

    /// Display name, as used by the flat-text store.
    pub fn name(&self) -> &'static str {
        match self {
            AccountKind::Savings { .. } => "Savings",
            AccountKind::Checking { .. } => "Checking",
        }
    }
}

//! Account definitions and the balance-mutation protocol.
//!
//! Every balance change goes through one `parking_lot::Mutex` owned by the
//! account. The lock is held for the whole read-modify-write, so operations
//! on the same account are linearizable while different accounts never
//! contend with each other.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tally_common::{is_positive_amount, AccountNumber, Result, TallyError};

use crate::balance::AccountKind;
use crate::customer::Customer;

/// Account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Account is active.
    Active,
    /// Account is frozen.
    Frozen,
    /// Account is closed.
    Closed,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "Active"),
            AccountStatus::Frozen => write!(f, "Frozen"),
            AccountStatus::Closed => write!(f, "Closed"),
        }
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AccountStatus::Active),
            "frozen" => Ok(AccountStatus::Frozen),
            "closed" => Ok(AccountStatus::Closed),
            other => Err(format!("unknown account status '{other}'")),
        }
    }
}

/// Balance-changing operation accepted by [`Transactable::process_transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Deposit,
    Withdrawal,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Deposit => write!(f, "DEPOSIT"),
            Operation::Withdrawal => write!(f, "WITHDRAWAL"),
        }
    }
}

/// Something whose balance can be moved through the single serialization
/// point. The transfer coordinator only talks to accounts through this.
pub trait Transactable: Send + Sync {
    /// Account number.
    fn account_number(&self) -> &AccountNumber;

    /// Current, fully-applied balance.
    fn balance(&self) -> Decimal;

    /// Apply a deposit or withdrawal and return the resulting balance.
    fn process_transaction(&self, amount: Decimal, operation: Operation) -> Result<Decimal>;
}

/// A customer account with a kind-specific withdrawal floor.
#[derive(Debug)]
pub struct Account {
    number: AccountNumber,
    customer: Arc<Customer>,
    kind: AccountKind,
    status: AccountStatus,
    created_at: DateTime<Utc>,
    balance: Mutex<Decimal>,
}

impl Account {
    /// Open an account. The initial balance must already satisfy the
    /// kind's floor.
    pub fn open(
        number: AccountNumber,
        customer: Arc<Customer>,
        kind: AccountKind,
        initial_balance: Decimal,
        status: AccountStatus,
    ) -> Result<Self> {
        if !number.is_valid() {
            return Err(TallyError::InvalidAccount(number.to_string()));
        }

        kind.check_opening(initial_balance)?;

        Ok(Self {
            number,
            customer,
            kind,
            status,
            created_at: Utc::now(),
            balance: Mutex::new(initial_balance),
        })
    }

    /// Account number.
    pub fn number(&self) -> &AccountNumber {
        &self.number
    }

    /// Owning customer.
    pub fn customer(&self) -> &Arc<Customer> {
        &self.customer
    }

    /// Withdrawal policy.
    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    /// `"Savings"` or `"Checking"`.
    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    /// Account status.
    pub fn status(&self) -> AccountStatus {
        self.status
    }

    /// When the account was opened (or reloaded).
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current balance.
    pub fn balance(&self) -> Decimal {
        *self.balance.lock()
    }

    /// Add `amount` to the balance. Returns the new balance.
    pub fn deposit(&self, amount: Decimal) -> Result<Decimal> {
        if !is_positive_amount(amount) {
            return Err(TallyError::non_positive(amount));
        }

        let mut balance = self.balance.lock();
        let new_balance = balance
            .checked_add(amount)
            .ok_or_else(|| TallyError::invalid_amount(amount, "Balance would overflow."))?;
        *balance = new_balance;

        debug!(account = %self.number, amount = %amount, balance = %new_balance, "Deposit applied");
        Ok(new_balance)
    }

    /// Remove `amount` from the balance if the kind's floor allows it.
    /// Returns the new balance.
    pub fn withdraw(&self, amount: Decimal) -> Result<Decimal> {
        if !is_positive_amount(amount) {
            return Err(TallyError::non_positive(amount));
        }

        let mut balance = self.balance.lock();
        let new_balance = self.kind.check_withdrawal(*balance, amount)?;
        *balance = new_balance;

        debug!(account = %self.number, amount = %amount, balance = %new_balance, "Withdrawal applied");
        Ok(new_balance)
    }

    /// Dispatch to [`deposit`](Self::deposit) or [`withdraw`](Self::withdraw).
    pub fn process_transaction(&self, amount: Decimal, operation: Operation) -> Result<Decimal> {
        match operation {
            Operation::Deposit => self.deposit(amount),
            Operation::Withdrawal => self.withdraw(amount),
        }
    }
}

impl Transactable for Account {
    fn account_number(&self) -> &AccountNumber {
        &self.number
    }

    fn balance(&self) -> Decimal {
        Account::balance(self)
    }

    fn process_transaction(&self, amount: Decimal, operation: Operation) -> Result<Decimal> {
        Account::process_transaction(self, amount, operation)
    }
}

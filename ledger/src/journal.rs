//! Transaction records kept by the ledger.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tally_common::{AccountNumber, TransactionId};

use crate::account::Operation;

/// Type of a ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    WireTransferIn,
    WireTransferOut,
}

impl TransactionType {
    /// Money coming into the account.
    pub fn is_credit(&self) -> bool {
        matches!(self, TransactionType::Deposit | TransactionType::WireTransferIn)
    }

    /// Money leaving the account.
    pub fn is_debit(&self) -> bool {
        !self.is_credit()
    }

    /// Wire name, e.g. `WIRE_TRANSFER_IN`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::WireTransferIn => "WIRE_TRANSFER_IN",
            TransactionType::WireTransferOut => "WIRE_TRANSFER_OUT",
        }
    }
}

impl From<Operation> for TransactionType {
    fn from(operation: Operation) -> Self {
        match operation {
            Operation::Deposit => TransactionType::Deposit,
            Operation::Withdrawal => TransactionType::Withdrawal,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [
            TransactionType::Deposit,
            TransactionType::Withdrawal,
            TransactionType::WireTransferIn,
            TransactionType::WireTransferOut,
        ]
        .into_iter()
        .find(|t| t.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown transaction type '{s}'"))
    }
}

/// A record waiting to be appended. The ledger assigns its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub account_number: AccountNumber,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

impl PendingTransaction {
    /// Create a pending record stamped with the current time.
    pub fn new(
        account_number: AccountNumber,
        transaction_type: TransactionType,
        amount: Decimal,
        balance_after: Decimal,
    ) -> Self {
        Self {
            account_number,
            transaction_type,
            amount,
            balance_after,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn into_record(self, id: TransactionId) -> TransactionRecord {
        TransactionRecord {
            id,
            account_number: self.account_number,
            transaction_type: self.transaction_type,
            amount: self.amount,
            balance_after: self.balance_after,
            created_at: self.created_at,
        }
    }
}

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Sequential id assigned at append time.
    pub id: TransactionId,
    /// Account the record belongs to.
    pub account_number: AccountNumber,
    /// Record type.
    pub transaction_type: TransactionType,
    /// Amount moved; always positive.
    pub amount: Decimal,
    /// Balance of the account right after the operation.
    pub balance_after: Decimal,
    /// When the operation happened.
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Amount with sign: positive for credits, negative for debits.
    pub fn signed_amount(&self) -> Decimal {
        if self.transaction_type.is_credit() {
            self.amount
        } else {
            -self.amount
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_parse_is_case_insensitive() {
        assert_eq!(
            "wire_transfer_in".parse::<TransactionType>().unwrap(),
            TransactionType::WireTransferIn
        );
        assert_eq!("Deposit".parse::<TransactionType>().unwrap(), TransactionType::Deposit);
        assert!("REFUND".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_credit_and_debit() {
        assert!(TransactionType::Deposit.is_credit());
        assert!(TransactionType::WireTransferIn.is_credit());
        assert!(TransactionType::Withdrawal.is_debit());
        assert!(TransactionType::WireTransferOut.is_debit());
    }

    #[test]
    fn test_signed_amount() {
        let record = PendingTransaction::new(
            AccountNumber::from_sequence(1),
            TransactionType::WireTransferOut,
            Decimal::from(500),
            Decimal::from(1500),
        )
        .into_record(TransactionId::new(1));

        assert_eq!(record.signed_amount(), Decimal::from(-500));
    }
}

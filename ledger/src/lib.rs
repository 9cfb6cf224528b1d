//! Tally Ledger
//!
//! Accounts with per-kind withdrawal floors, the append-only transaction
//! ledger, and the flat-file store both are persisted with.

pub mod account;
pub mod balance;
pub mod customer;
pub mod engine;
pub mod journal;
pub mod store;

pub use account::{Account, AccountStatus, Operation, Transactable};
pub use balance::AccountKind;
pub use customer::{Customer, CustomerTier};
pub use engine::Ledger;
pub use journal::{PendingTransaction, TransactionRecord, TransactionType};
pub use store::{AccountRow, FlatFileStore, StoreError, StoredKind};

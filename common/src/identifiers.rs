//! Identifier types for Tally entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Account number, e.g. `ACC001`.
/// Stored upper-cased so that lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Create an account number from any string, normalizing case.
    pub fn new(number: impl AsRef<str>) -> Self {
        Self(number.as_ref().trim().to_uppercase())
    }

    /// Create the account number for a directory sequence value.
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("ACC{:03}", sequence))
    }

    /// Get the number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the number is usable as a lookup key.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountNumber {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AccountNumber {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Customer identifier, e.g. `CUS001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(u64);

impl CustomerId {
    /// Create from a sequence value.
    pub fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    /// Get the sequence value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CUS{:03}", self.0)
    }
}

/// Ledger transaction identifier, e.g. `TXN001`.
/// Assigned by the ledger at append time; strictly increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Create from a sequence value.
    pub fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    /// Get the sequence value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Parse the `TXN001` display form (the prefix is optional).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let digits = s
            .strip_prefix("TXN")
            .or_else(|| s.strip_prefix("txn"))
            .unwrap_or(s);
        digits.parse().ok().map(Self)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TXN{:03}", self.0)
    }
}

/// Monotonic id source. Each directory or ledger owns its own generator,
/// so two instances never share a sequence.
#[derive(Debug)]
pub struct SequenceGenerator {
    last: AtomicU64,
}

impl SequenceGenerator {
    /// Create a generator whose first value is 1.
    pub fn new() -> Self {
        Self::starting_after(0)
    }

    /// Create a generator whose first value is `last + 1`.
    pub fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Take the next value.
    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last value handed out (0 if none).
    pub fn current(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }

    /// Make sure future values are greater than `value`.
    pub fn resume_after(&self, value: u64) {
        self.last.fetch_max(value, Ordering::SeqCst);
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

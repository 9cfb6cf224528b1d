//! Coordinator configuration.

use std::path::PathBuf;

use rust_decimal::Decimal;

use tally_ledger::balance::{DEFAULT_MINIMUM_BALANCE, DEFAULT_OVERDRAFT_LIMIT};
use tally_ledger::{AccountKind, StoredKind};

/// Withdrawal policy limits applied to newly opened and reloaded accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    /// Savings minimum balance.
    pub savings_minimum_balance: Decimal,
    /// Checking overdraft limit.
    pub checking_overdraft_limit: Decimal,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            savings_minimum_balance: Decimal::from(DEFAULT_MINIMUM_BALANCE),
            checking_overdraft_limit: Decimal::from(DEFAULT_OVERDRAFT_LIMIT),
        }
    }
}

impl PolicyConfig {
    pub fn savings(&self) -> AccountKind {
        AccountKind::savings(self.savings_minimum_balance)
    }

    pub fn checking(&self) -> AccountKind {
        AccountKind::checking(self.checking_overdraft_limit)
    }

    /// Kind for a stored account type column.
    pub fn kind_for(&self, stored: StoredKind) -> AccountKind {
        match stored {
            StoredKind::Savings => self.savings(),
            StoredKind::Checking => self.checking(),
        }
    }

    /// Validate the limits.
    pub fn validate(&self) -> Result<(), String> {
        if self.savings_minimum_balance.is_sign_negative() {
            return Err("Savings minimum balance cannot be negative".to_string());
        }

        if self.checking_overdraft_limit.is_sign_negative() {
            return Err("Checking overdraft limit cannot be negative".to_string());
        }

        Ok(())
    }
}

/// Main coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Withdrawal policy limits.
    pub policy: PolicyConfig,
    /// Directory holding `accounts.txt` and `transactions.txt`.
    pub data_dir: PathBuf,
    /// Log level.
    pub log_level: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("TALLY_SAVINGS_MINIMUM_BALANCE") {
            if let Ok(value) = value.parse() {
                config.policy.savings_minimum_balance = value;
            }
        }

        if let Ok(value) = std::env::var("TALLY_CHECKING_OVERDRAFT_LIMIT") {
            if let Ok(value) = value.parse() {
                config.policy.checking_overdraft_limit = value;
            }
        }

        if let Ok(dir) = std::env::var("TALLY_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.policy.validate()?;

        if self.data_dir.as_os_str().is_empty() {
            return Err("Data directory cannot be empty".to_string());
        }

        Ok(())
    }
}

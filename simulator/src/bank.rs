//! Simulated bank: a directory, a ledger and a transfer coordinator wired
//! together, with generated customers.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use tally_common::Result;
use tally_coordinator::{InMemoryDirectory, PolicyConfig, TransferCoordinator};
use tally_ledger::store::StoreResult;
use tally_ledger::{Account, Customer, CustomerTier, FlatFileStore, Ledger};

use crate::scenario::AccountType;

/// A simulated bank for workload runs.
pub struct SimulatedBank {
    directory: Arc<InMemoryDirectory>,
    ledger: Arc<Ledger>,
    coordinator: Arc<TransferCoordinator<InMemoryDirectory>>,
}

impl SimulatedBank {
    /// Create an empty bank.
    pub fn new(policy: PolicyConfig) -> Self {
        Self::with_ledger(policy, Ledger::new())
    }

    fn with_ledger(policy: PolicyConfig, ledger: Ledger) -> Self {
        let directory = Arc::new(InMemoryDirectory::new(policy));
        let ledger = Arc::new(ledger);
        let coordinator = Arc::new(TransferCoordinator::new(directory.clone(), ledger.clone()));

        Self {
            directory,
            ledger,
            coordinator,
        }
    }

    /// Restore accounts and ledger from a data directory.
    pub fn load(policy: PolicyConfig, store: &FlatFileStore) -> StoreResult<Self> {
        let bank = Self::with_ledger(policy, Ledger::restore(store.load_transactions()?));
        bank.directory.load_from(store)?;

        info!(
            accounts = bank.directory.len(),
            records = bank.ledger.len(),
            "Bank restored"
        );
        Ok(bank)
    }

    /// Persist accounts and ledger.
    pub fn save(&self, store: &FlatFileStore) -> StoreResult<()> {
        self.directory.save_to(store)?;
        store.save_transactions(&self.ledger.records())?;
        Ok(())
    }

    pub fn directory(&self) -> &Arc<InMemoryDirectory> {
        &self.directory
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn coordinator(&self) -> &Arc<TransferCoordinator<InMemoryDirectory>> {
        &self.coordinator
    }

    /// Open an account for the next generated customer.
    pub fn open_account(&self, account_type: AccountType, balance: Decimal) -> Result<Arc<Account>> {
        let customer = CustomerFactory::create(&self.directory);
        match account_type {
            AccountType::Savings => self.directory.open_savings(customer, balance),
            AccountType::Checking => self.directory.open_checking(customer, balance),
        }
    }
}

impl Default for SimulatedBank {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

/// Customer factory for generated account holders.
pub struct CustomerFactory;

impl CustomerFactory {
    const NAMES: [&'static str; 10] = [
        "Alice Johnson",
        "Brian Smith",
        "Carmen Lopez",
        "David Kim",
        "Elena Petrova",
        "Farid Haddad",
        "Grace Okafor",
        "Hiro Tanaka",
        "Ingrid Larsen",
        "Jamal Wright",
    ];

    /// Register the next generated customer. Every third one is premium.
    pub fn create(directory: &InMemoryDirectory) -> Arc<Customer> {
        let index = directory.len();
        let name = match Self::NAMES.get(index) {
            Some(name) => name.to_string(),
            // Beyond the predefined list
            None => format!("Customer {}", index + 1),
        };
        let handle = name.to_lowercase().replace(' ', ".");
        let tier = if index % 3 == 2 {
            CustomerTier::Premium
        } else {
            CustomerTier::Regular
        };

        directory.register_customer(
            name,
            25 + (index % 40) as u32,
            format!("{handle}@example.com"),
            format!("555-{:04}", index + 1),
            format!("{} Main St", 100 + index),
            tier,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_common::TallyError;
    use tally_coordinator::AccountDirectory;

    #[test]
    fn test_open_accounts_get_generated_customers() {
        let bank = SimulatedBank::default();

        let first = bank.open_account(AccountType::Checking, Decimal::from(1000)).unwrap();
        let second = bank.open_account(AccountType::Savings, Decimal::from(1000)).unwrap();

        assert_eq!(first.number().as_str(), "ACC001");
        assert_eq!(first.customer().name, "Alice Johnson");
        assert_eq!(second.kind_name(), "Savings");
        assert_eq!(second.customer().email, "brian.smith@example.com");
    }

    #[test]
    fn test_savings_below_floor_is_refused() {
        let bank = SimulatedBank::default();
        let err = bank.open_account(AccountType::Savings, Decimal::from(100)).unwrap_err();
        assert!(matches!(err, TallyError::InvalidAmount { .. }));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());

        let bank = SimulatedBank::default();
        bank.open_account(AccountType::Checking, Decimal::from(2000)).unwrap();
        bank.open_account(AccountType::Checking, Decimal::from(1000)).unwrap();
        bank.coordinator()
            .wire_transfer("ACC001", "ACC002", Decimal::from(500))
            .unwrap();
        bank.save(&store).unwrap();

        let restored = SimulatedBank::load(PolicyConfig::default(), &store).unwrap();
        assert_eq!(restored.ledger().len(), 2);
        assert_eq!(
            restored.directory().resolve("ACC002").unwrap().balance(),
            Decimal::from(1500)
        );

        let receipt = restored
            .coordinator()
            .wire_transfer("ACC002", "ACC001", Decimal::from(100))
            .unwrap();
        assert_eq!(receipt.out_id.to_string(), "TXN003");
    }
}

//! Account directory: resolves account numbers to live accounts.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use tally_common::{AccountNumber, CustomerId, Result, SequenceGenerator, TallyError};
use tally_ledger::store::StoreResult;
use tally_ledger::{
    Account, AccountKind, AccountStatus, Customer, CustomerTier, FlatFileStore, Transactable,
};

use crate::config::PolicyConfig;

/// Lookup of accounts by number.
pub trait AccountDirectory: Send + Sync {
    /// Account handle type returned by [`resolve`](Self::resolve).
    type Account: Transactable;

    /// Resolve an account number. Unknown or empty numbers fail with
    /// [`TallyError::InvalidAccount`].
    fn resolve(&self, account_number: &str) -> Result<Arc<Self::Account>>;
}

/// In-process directory backed by concurrent maps.
///
/// Account numbers are normalized on the way in, so lookups are
/// case-insensitive. The directory owns both the account and the customer
/// id sequences.
pub struct InMemoryDirectory {
    accounts: DashMap<AccountNumber, Arc<Account>>,
    customers: DashMap<CustomerId, Arc<Customer>>,
    account_ids: SequenceGenerator,
    customer_ids: SequenceGenerator,
    policy: PolicyConfig,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new(policy: PolicyConfig) -> Self {
        Self {
            accounts: DashMap::new(),
            customers: DashMap::new(),
            account_ids: SequenceGenerator::new(),
            customer_ids: SequenceGenerator::new(),
            policy,
        }
    }

    /// Policy limits used for new and reloaded accounts.
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Register a customer under the next `CUSnnn` id.
    pub fn register_customer(
        &self,
        name: impl Into<String>,
        age: u32,
        email: impl Into<String>,
        contact: impl Into<String>,
        address: impl Into<String>,
        tier: CustomerTier,
    ) -> Arc<Customer> {
        let id = CustomerId::new(self.customer_ids.next());
        let customer = Arc::new(Customer::new(id, name, age, email, contact, address, tier));
        self.customers.insert(id, customer.clone());
        customer
    }

    /// Look up a registered customer.
    pub fn customer(&self, id: CustomerId) -> Option<Arc<Customer>> {
        self.customers.get(&id).map(|c| c.clone())
    }

    /// Open an account under the next `ACCnnn` number.
    #[instrument(skip(self, customer), fields(customer_id = %customer.id))]
    pub fn open_account(
        &self,
        customer: Arc<Customer>,
        kind: AccountKind,
        initial_balance: Decimal,
    ) -> Result<Arc<Account>> {
        // Refused openings must not use up a number.
        kind.check_opening(initial_balance)?;

        let number = AccountNumber::from_sequence(self.account_ids.next());
        let account = Account::open(number, customer, kind, initial_balance, AccountStatus::Active)?;

        info!(
            account = %account.number(),
            kind = account.kind_name(),
            balance = %initial_balance,
            "Account opened"
        );
        Ok(self.insert(account))
    }

    /// Open a savings account with the configured minimum balance.
    pub fn open_savings(&self, customer: Arc<Customer>, initial_balance: Decimal) -> Result<Arc<Account>> {
        self.open_account(customer, self.policy.savings(), initial_balance)
    }

    /// Open a checking account with the configured overdraft limit.
    pub fn open_checking(&self, customer: Arc<Customer>, initial_balance: Decimal) -> Result<Arc<Account>> {
        self.open_account(customer, self.policy.checking(), initial_balance)
    }

    /// Add an already-built account, e.g. one reloaded from disk. New
    /// numbers continue after any `ACCnnn` number inserted this way.
    pub fn insert(&self, account: Account) -> Arc<Account> {
        if let Some(sequence) = account
            .number()
            .as_str()
            .strip_prefix("ACC")
            .and_then(|digits| digits.parse().ok())
        {
            self.account_ids.resume_after(sequence);
        }

        let customer = account.customer().clone();
        self.customer_ids.resume_after(customer.id.value());
        self.customers.entry(customer.id).or_insert(customer);

        let account = Arc::new(account);
        self.accounts.insert(account.number().clone(), account.clone());
        account
    }

    /// Look up an account without failing.
    pub fn get(&self, account_number: &str) -> Option<Arc<Account>> {
        self.accounts
            .get(&AccountNumber::new(account_number))
            .map(|a| a.clone())
    }

    /// All accounts ordered by number.
    pub fn accounts(&self) -> Vec<Arc<Account>> {
        let mut accounts: Vec<Arc<Account>> = self.accounts.iter().map(|e| e.value().clone()).collect();
        accounts.sort_by(|a, b| a.number().cmp(b.number()));
        accounts
    }

    /// Sum of all balances.
    pub fn total_balance(&self) -> Decimal {
        self.accounts.iter().map(|e| e.value().balance()).sum()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Load accounts from the store. Each line gets a freshly registered
    /// customer and the configured limits for its type.
    pub fn load_from(&self, store: &FlatFileStore) -> StoreResult<usize> {
        let rows = store.load_accounts()?;
        let count = rows.len();

        for row in rows {
            let customer = self.register_customer(
                row.name.clone(),
                row.age,
                row.email.clone(),
                row.contact.clone(),
                row.address.clone(),
                row.tier,
            );
            let kind = self.policy.kind_for(row.kind);
            self.insert(row.into_account(customer, kind)?);
        }

        info!(accounts = count, "Directory loaded");
        Ok(count)
    }

    /// Persist every account in number order.
    pub fn save_to(&self, store: &FlatFileStore) -> StoreResult<usize> {
        let accounts = self.accounts();
        store.save_accounts(accounts.iter().map(|a| a.as_ref()))
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

impl AccountDirectory for InMemoryDirectory {
    type Account = Account;

    fn resolve(&self, account_number: &str) -> Result<Arc<Account>> {
        self.get(account_number)
            .ok_or_else(|| TallyError::InvalidAccount(account_number.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_directory() -> InMemoryDirectory {
        InMemoryDirectory::default()
    }

    fn create_test_customer(directory: &InMemoryDirectory) -> Arc<Customer> {
        directory.register_customer(
            "John Doe",
            30,
            "test@gmail.com",
            "123-456-7890",
            "123 Main St",
            CustomerTier::Regular,
        )
    }

    #[test]
    fn test_open_assigns_sequential_numbers() {
        let directory = create_test_directory();
        let customer = create_test_customer(&directory);

        let first = directory.open_checking(customer.clone(), Decimal::from(1000)).unwrap();
        let second = directory.open_savings(customer.clone(), Decimal::from(1000)).unwrap();

        assert_eq!(first.number().as_str(), "ACC001");
        assert_eq!(second.number().as_str(), "ACC002");
        assert_eq!(customer.id.to_string(), "CUS001");
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.total_balance(), Decimal::from(2000));
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let directory = create_test_directory();
        let customer = create_test_customer(&directory);
        directory.open_checking(customer, Decimal::from(1000)).unwrap();

        assert!(directory.resolve("acc001").is_ok());
        assert!(directory.resolve(" ACC001 ").is_ok());
        assert!(matches!(directory.resolve("ACC999"), Err(TallyError::InvalidAccount(_))));
        assert!(matches!(directory.resolve(""), Err(TallyError::InvalidAccount(_))));
    }

    #[test]
    fn test_open_below_floor_consumes_no_account() {
        let directory = create_test_directory();
        let customer = create_test_customer(&directory);

        assert!(matches!(
            directory.open_savings(customer.clone(), Decimal::from(100)),
            Err(TallyError::InvalidAmount { .. })
        ));
        assert!(directory.is_empty());

        let account = directory.open_savings(customer, Decimal::from(500)).unwrap();
        assert_eq!(account.number().as_str(), "ACC001");
    }

    #[test]
    fn test_directories_do_not_share_sequences() {
        let first = create_test_directory();
        let second = create_test_directory();

        let a = first.open_checking(create_test_customer(&first), Decimal::ZERO).unwrap();
        let b = second.open_checking(create_test_customer(&second), Decimal::ZERO).unwrap();

        assert_eq!(a.number(), b.number());
    }

    #[test]
    fn test_save_and_load_resume_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());

        let directory = create_test_directory();
        let customer = create_test_customer(&directory);
        directory.open_checking(customer.clone(), Decimal::from(1000)).unwrap();
        directory.open_savings(customer, Decimal::from(2500)).unwrap();
        directory.save_to(&store).unwrap();

        let reloaded = create_test_directory();
        assert_eq!(reloaded.load_from(&store).unwrap(), 2);
        assert_eq!(reloaded.total_balance(), Decimal::from(3500));
        assert_eq!(reloaded.resolve("ACC002").unwrap().kind_name(), "Savings");

        let next = reloaded
            .open_checking(create_test_customer(&reloaded), Decimal::ZERO)
            .unwrap();
        assert_eq!(next.number().as_str(), "ACC003");
    }
}

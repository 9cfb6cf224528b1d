//! Pipe-delimited flat-file persistence for accounts and ledger records.
//!
//! Account lines:
//! `number|type|status|balance|name|age|email|contact|address|customerType`.
//! Older files omit the email column; those lines still load.
//!
//! Transaction lines: `id|account|type|amount|balanceAfter|timestamp`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use tally_common::{
    is_positive_amount, parse_amount, AccountNumber, CustomerId, TallyError, TransactionId,
};

use crate::account::{Account, AccountStatus};
use crate::balance::AccountKind;
use crate::customer::{Customer, CustomerTier, UNKNOWN_EMAIL};
use crate::journal::TransactionRecord;

const ACCOUNTS_FILE: &str = "accounts.txt";
const TRANSACTIONS_FILE: &str = "transactions.txt";

const ACCOUNT_FIELDS: usize = 10;
const LEGACY_ACCOUNT_FIELDS: usize = 9;
const TRANSACTION_FIELDS: usize = 6;

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("Record violates account invariants: {0}")]
    Invalid(#[from] TallyError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Stored account type column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredKind {
    Savings,
    Checking,
}

impl StoredKind {
    /// `Savings` in any case selects savings; anything else is checking.
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("savings") {
            StoredKind::Savings
        } else {
            StoredKind::Checking
        }
    }
}

/// One account line decoded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRow {
    pub number: AccountNumber,
    pub kind: StoredKind,
    pub status: AccountStatus,
    pub balance: Decimal,
    pub name: String,
    pub age: u32,
    pub email: String,
    pub contact: String,
    pub address: String,
    pub tier: CustomerTier,
}

impl AccountRow {
    /// Build the customer record under the given id.
    pub fn customer(&self, id: CustomerId) -> Customer {
        Customer::new(
            id,
            self.name.clone(),
            self.age,
            self.email.clone(),
            self.contact.clone(),
            self.address.clone(),
            self.tier,
        )
    }

    /// Rebuild the account. The floor is checked exactly as for a new account.
    pub fn into_account(self, customer: Arc<Customer>, kind: AccountKind) -> StoreResult<Account> {
        Ok(Account::open(self.number, customer, kind, self.balance, self.status)?)
    }
}

/// Flat-file store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FlatFileStore {
    dir: PathBuf,
}

impl FlatFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn accounts_path(&self) -> PathBuf {
        self.dir.join(ACCOUNTS_FILE)
    }

    pub fn transactions_path(&self) -> PathBuf {
        self.dir.join(TRANSACTIONS_FILE)
    }

    /// Overwrite the accounts file.
    pub fn save_accounts<'a, I>(&self, accounts: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = &'a Account>,
    {
        fs::create_dir_all(&self.dir)?;
        let mut writer = pipe_writer(&self.accounts_path())?;

        let mut written = 0;
        for account in accounts {
            let customer = account.customer();
            writer.write_record([
                account.number().as_str(),
                account.kind_name(),
                &account.status().to_string(),
                &account.balance().to_string(),
                &customer.name,
                &customer.age.to_string(),
                &customer.email,
                &customer.contact,
                &customer.address,
                &customer.tier.to_string(),
            ])?;
            written += 1;
        }
        writer.flush()?;

        info!(path = %self.accounts_path().display(), accounts = written, "Accounts saved");
        Ok(written)
    }

    /// Load every account line. A missing file loads as empty.
    pub fn load_accounts(&self) -> StoreResult<Vec<AccountRow>> {
        let rows = read_records(&self.accounts_path(), |line, record| {
            let email_offset = match record.len() {
                ACCOUNT_FIELDS => 1,
                LEGACY_ACCOUNT_FIELDS => 0,
                n => {
                    return Err(malformed(
                        line,
                        format!("expected {ACCOUNT_FIELDS} or {LEGACY_ACCOUNT_FIELDS} fields, found {n}"),
                    ))
                }
            };

            let field = |i: usize| record.get(i).unwrap_or_default();
            let email = if email_offset == 1 {
                field(6).to_string()
            } else {
                UNKNOWN_EMAIL.to_string()
            };

            Ok(AccountRow {
                number: AccountNumber::new(field(0)),
                kind: StoredKind::parse(field(1)),
                status: field(2).parse().map_err(|e: String| malformed(line, e))?,
                balance: parse_decimal(line, field(3))?,
                name: field(4).to_string(),
                age: field(5)
                    .parse()
                    .map_err(|_| malformed(line, format!("invalid age '{}'", field(5))))?,
                email,
                contact: field(6 + email_offset).to_string(),
                address: field(7 + email_offset).to_string(),
                tier: match field(8 + email_offset).parse() {
                    Ok(tier) => tier,
                    Err(never) => match never {},
                },
            })
        })?;

        info!(path = %self.accounts_path().display(), accounts = rows.len(), "Accounts loaded");
        Ok(rows)
    }

    /// Overwrite the transactions file, keeping ledger order.
    pub fn save_transactions(&self, records: &[TransactionRecord]) -> StoreResult<usize> {
        fs::create_dir_all(&self.dir)?;
        let mut writer = pipe_writer(&self.transactions_path())?;

        for record in records {
            writer.write_record([
                record.id.to_string(),
                record.account_number.to_string(),
                record.transaction_type.to_string(),
                record.amount.to_string(),
                record.balance_after.to_string(),
                record.created_at.to_rfc3339(),
            ])?;
        }
        writer.flush()?;

        info!(path = %self.transactions_path().display(), records = records.len(), "Transactions saved");
        Ok(records.len())
    }

    /// Load ledger records in file order. A missing file loads as empty.
    ///
    /// Reloaded records must satisfy the same rules as appended ones: a
    /// positive amount and an id greater than every id before it. A line
    /// that breaks either rule is a [`StoreError::MalformedRecord`].
    pub fn load_transactions(&self) -> StoreResult<Vec<TransactionRecord>> {
        let mut last_id = 0;
        let records = read_records(&self.transactions_path(), |line, record| {
            if record.len() != TRANSACTION_FIELDS {
                return Err(malformed(
                    line,
                    format!("expected {TRANSACTION_FIELDS} fields, found {}", record.len()),
                ));
            }

            let field = |i: usize| record.get(i).unwrap_or_default();

            let id = TransactionId::parse(field(0))
                .ok_or_else(|| malformed(line, format!("invalid transaction id '{}'", field(0))))?;
            if id.value() <= last_id {
                return Err(malformed(
                    line,
                    format!("transaction id {id} does not follow TXN{last_id:03}"),
                ));
            }

            let amount = parse_decimal(line, field(3))?;
            if !is_positive_amount(amount) {
                return Err(malformed(line, format!("non-positive amount {amount}")));
            }
            last_id = id.value();

            Ok(TransactionRecord {
                id,
                account_number: AccountNumber::new(field(1)),
                transaction_type: field(2).parse().map_err(|e: String| malformed(line, e))?,
                amount,
                balance_after: parse_decimal(line, field(4))?,
                created_at: DateTime::parse_from_rfc3339(field(5))
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| malformed(line, format!("invalid timestamp: {e}")))?,
            })
        })?;

        info!(path = %self.transactions_path().display(), records = records.len(), "Transactions loaded");
        Ok(records)
    }
}

fn pipe_writer(path: &Path) -> StoreResult<csv::Writer<fs::File>> {
    Ok(WriterBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .from_path(path)?)
}

fn read_records<T, F>(path: &Path, mut decode: F) -> StoreResult<Vec<T>>
where
    F: FnMut(u64, &StringRecord) -> StoreResult<T>,
{
    if !path.exists() {
        debug!(path = %path.display(), "No file, nothing to load");
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut decoded = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        decoded.push(decode(line, &record)?);
    }
    Ok(decoded)
}

fn parse_decimal(line: u64, value: &str) -> StoreResult<Decimal> {
    parse_amount(value).map_err(|_| malformed(line, format!("invalid amount '{value}'")))
}

fn malformed(line: u64, reason: impl Into<String>) -> StoreError {
    StoreError::MalformedRecord {
        line,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Ledger;
    use crate::journal::{PendingTransaction, TransactionType};

    fn open(number: u64, kind: AccountKind, balance: i64, tier: CustomerTier) -> Account {
        let customer = Arc::new(Customer::new(
            CustomerId::new(number),
            "John Doe",
            30,
            "john@example.com",
            "123-456-7890",
            "123 Main St",
            tier,
        ));
        Account::open(
            AccountNumber::from_sequence(number),
            customer,
            kind,
            Decimal::from(balance),
            AccountStatus::Active,
        )
        .unwrap()
    }

    #[test]
    fn test_accounts_survive_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());

        let accounts = vec![
            open(1, AccountKind::default_savings(), 1500, CustomerTier::Premium),
            open(2, AccountKind::default_checking(), -250, CustomerTier::Regular),
        ];
        assert_eq!(store.save_accounts(&accounts).unwrap(), 2);

        let text = fs::read_to_string(store.accounts_path()).unwrap();
        assert!(text.starts_with("ACC001|Savings|Active|1500|John Doe|30|john@example.com|"));

        let rows = store.load_accounts().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, StoredKind::Savings);
        assert_eq!(rows[0].tier, CustomerTier::Premium);
        assert_eq!(rows[1].kind, StoredKind::Checking);
        assert_eq!(rows[1].balance, Decimal::from(-250));

        let row = rows[1].clone();
        let customer = Arc::new(row.customer(CustomerId::new(7)));
        let account = row
            .into_account(customer, AccountKind::default_checking())
            .unwrap();
        assert_eq!(account.balance(), Decimal::from(-250));
        assert_eq!(account.customer().id.to_string(), "CUS007");
    }

    #[test]
    fn test_legacy_line_gets_placeholder_email() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());
        fs::write(
            store.accounts_path(),
            "acc004|Checking|active|750.50|Jane Smith|41|987-654-3210|456 Oak Ave|premium\n\n",
        )
        .unwrap();

        let rows = store.load_accounts().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].number.as_str(), "ACC004");
        assert_eq!(rows[0].email, UNKNOWN_EMAIL);
        assert_eq!(rows[0].contact, "987-654-3210");
        assert_eq!(rows[0].address, "456 Oak Ave");
        assert_eq!(rows[0].balance, Decimal::new(75050, 2));
        assert_eq!(rows[0].tier, CustomerTier::Premium);
    }

    #[test]
    fn test_wrong_field_count_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());
        fs::write(store.accounts_path(), "ACC001|Savings|Active|1000\n").unwrap();

        let err = store.load_accounts().unwrap_err();
        assert!(matches!(err, StoreError::MalformedRecord { line: 1, .. }));
    }

    #[test]
    fn test_reloaded_account_checks_floor() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());
        fs::write(
            store.accounts_path(),
            "ACC001|Savings|Active|100|John Doe|30|j@x.com|555|1 Road|Regular\n",
        )
        .unwrap();

        let row = store.load_accounts().unwrap().remove(0);
        let customer = Arc::new(row.customer(CustomerId::new(1)));
        let err = row
            .into_account(customer, AccountKind::default_savings())
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(TallyError::InvalidAmount { .. })));
    }

    #[test]
    fn test_missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path().join("nothing-here"));

        assert!(store.load_accounts().unwrap().is_empty());
        assert!(store.load_transactions().unwrap().is_empty());
    }

    #[test]
    fn test_transactions_keep_order_and_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());

        let ledger = Ledger::new();
        ledger.append_all(vec![
            PendingTransaction::new(
                AccountNumber::from_sequence(1),
                TransactionType::WireTransferOut,
                Decimal::from(500),
                Decimal::from(1500),
            ),
            PendingTransaction::new(
                AccountNumber::from_sequence(2),
                TransactionType::WireTransferIn,
                Decimal::from(500),
                Decimal::from(1500),
            ),
        ]);
        store.save_transactions(&ledger.records()).unwrap();

        let loaded = store.load_transactions().unwrap();
        assert_eq!(loaded, ledger.records());

        let restored = Ledger::restore(loaded);
        assert_eq!(restored.total_withdrawals("ACC001"), Decimal::from(500));
        assert_eq!(restored.total_deposits("ACC002"), Decimal::from(500));
    }

    #[test]
    fn test_bad_transaction_type_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());
        fs::write(
            store.transactions_path(),
            "TXN001|ACC001|REFUND|10|10|2024-01-01T00:00:00+00:00\n",
        )
        .unwrap();

        assert!(matches!(
            store.load_transactions(),
            Err(StoreError::MalformedRecord { .. })
        ));
    }

    fn load_error(store: &FlatFileStore, lines: &[&str]) -> (u64, String) {
        fs::write(store.transactions_path(), lines.join("\n")).unwrap();
        match store.load_transactions() {
            Err(StoreError::MalformedRecord { line, reason }) => (line, reason),
            other => panic!("expected a malformed record, got {other:?}"),
        }
    }

    #[test]
    fn test_non_positive_transaction_amount_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());

        for amount in ["-50", "0"] {
            let bad = format!("TXN002|ACC001|DEPOSIT|{amount}|1000|2024-01-01T00:00:00+00:00");
            let (line, reason) = load_error(
                &store,
                &["TXN001|ACC001|DEPOSIT|10|1010|2024-01-01T00:00:00+00:00", &bad],
            );
            assert_eq!(line, 2);
            assert!(reason.contains("non-positive"), "{reason}");
        }
    }

    #[test]
    fn test_repeated_transaction_id_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());

        let (line, _) = load_error(
            &store,
            &[
                "TXN002|ACC001|DEPOSIT|10|1010|2024-01-01T00:00:00+00:00",
                "TXN002|ACC001|DEPOSIT|10|1020|2024-01-01T00:00:00+00:00",
            ],
        );
        assert_eq!(line, 2);
    }

    #[test]
    fn test_out_of_order_transaction_id_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());

        let (line, reason) = load_error(
            &store,
            &[
                "TXN005|ACC001|DEPOSIT|50|1050|2024-01-01T00:00:00+00:00",
                "TXN002|ACC001|DEPOSIT|10|1060|2024-01-01T00:00:00+00:00",
            ],
        );
        assert_eq!(line, 2);
        assert!(reason.contains("TXN005"), "{reason}");
    }
}

//! Append-only transaction ledger.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{debug, info};

use tally_common::{is_positive_amount, AccountNumber, SequenceGenerator, TransactionId};

use crate::journal::{PendingTransaction, TransactionRecord};

/// Append-only, ordered store of transaction records.
///
/// The ledger owns the transaction-id sequence. Appends take a write lock,
/// so concurrent appends never interleave partial records, and a batch
/// appended with [`append_all`](Self::append_all) stays contiguous.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: RwLock<Vec<TransactionRecord>>,
    ids: SequenceGenerator,
}

impl Ledger {
    /// Create an empty ledger whose first id is `TXN001`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted records, keeping their order and ids.
    /// New appends continue after the highest restored id.
    pub fn restore(records: Vec<TransactionRecord>) -> Self {
        let last = records.iter().map(|r| r.id.value()).max().unwrap_or(0);

        info!(records = records.len(), last_id = last, "Ledger restored");

        Self {
            entries: RwLock::new(records),
            ids: SequenceGenerator::starting_after(last),
        }
    }

    /// Append a record. Records with an empty account number or a
    /// non-positive amount are dropped without error; `None` is returned.
    pub fn append(&self, pending: PendingTransaction) -> Option<TransactionId> {
        let mut entries = self.entries.write();
        self.push_locked(&mut entries, pending)
    }

    /// Append a batch in order under a single write lock.
    /// Returns the ids of the records that were accepted.
    pub fn append_all<I>(&self, batch: I) -> Vec<TransactionId>
    where
        I: IntoIterator<Item = PendingTransaction>,
    {
        let mut entries = self.entries.write();

        let ids: Vec<TransactionId> = batch
            .into_iter()
            .filter_map(|pending| self.push_locked(&mut entries, pending))
            .collect();

        debug!(appended = ids.len(), total = entries.len(), "Batch appended");
        ids
    }

    /// Records of one account in append order. The query is normalized the
    /// same way account numbers are, so `acc001` matches `ACC001`. An empty
    /// account number yields an empty result.
    pub fn by_account(&self, account_number: &str) -> Vec<TransactionRecord> {
        let number = AccountNumber::new(account_number);
        if !number.is_valid() {
            return Vec::new();
        }

        self.entries
            .read()
            .iter()
            .filter(|r| r.account_number == number)
            .cloned()
            .collect()
    }

    /// Sum of DEPOSIT and WIRE_TRANSFER_IN amounts for an account.
    pub fn total_deposits(&self, account_number: &str) -> Decimal {
        self.by_account(account_number)
            .iter()
            .filter(|r| r.transaction_type.is_credit())
            .map(|r| r.amount)
            .sum()
    }

    /// Sum of WITHDRAWAL and WIRE_TRANSFER_OUT amounts for an account.
    pub fn total_withdrawals(&self, account_number: &str) -> Decimal {
        self.by_account(account_number)
            .iter()
            .filter(|r| r.transaction_type.is_debit())
            .map(|r| r.amount)
            .sum()
    }

    /// `total_deposits - total_withdrawals`.
    pub fn net_change(&self, account_number: &str) -> Decimal {
        self.by_account(account_number)
            .iter()
            .map(TransactionRecord::signed_amount)
            .sum()
    }

    /// Snapshot of every record in append order.
    pub fn records(&self) -> Vec<TransactionRecord> {
        self.entries.read().clone()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push_locked(
        &self,
        entries: &mut Vec<TransactionRecord>,
        pending: PendingTransaction,
    ) -> Option<TransactionId> {
        if !pending.account_number.is_valid() || !is_positive_amount(pending.amount) {
            debug!(
                account = %pending.account_number,
                amount = %pending.amount,
                "Dropping malformed ledger record"
            );
            return None;
        }

        // Taken while holding the write lock so id order matches append order.
        let id = TransactionId::new(self.ids.next());
        entries.push(pending.into_record(id));
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::TransactionType;
    use proptest::prelude::*;

    fn pending(account: &str, transaction_type: TransactionType, amount: i64) -> PendingTransaction {
        PendingTransaction::new(
            AccountNumber::new(account),
            transaction_type,
            Decimal::from(amount),
            Decimal::ZERO,
        )
    }

    #[test]
    fn test_append_assigns_sequential_ids() {
        let ledger = Ledger::new();

        let first = ledger.append(pending("ACC001", TransactionType::Deposit, 100));
        let second = ledger.append(pending("ACC002", TransactionType::Deposit, 100));

        assert_eq!(first, Some(TransactionId::new(1)));
        assert_eq!(second, Some(TransactionId::new(2)));
        assert_eq!(ledger.records()[0].id.to_string(), "TXN001");
    }

    #[test]
    fn test_malformed_records_dropped_silently() {
        let ledger = Ledger::new();

        assert!(ledger.append(pending("", TransactionType::Deposit, 100)).is_none());
        assert!(ledger.append(pending("ACC001", TransactionType::Deposit, 0)).is_none());
        assert!(ledger.append(pending("ACC001", TransactionType::Withdrawal, -5)).is_none());
        assert!(ledger.is_empty());

        // Dropped records do not consume ids.
        assert_eq!(
            ledger.append(pending("ACC001", TransactionType::Deposit, 1)),
            Some(TransactionId::new(1))
        );
    }

    #[test]
    fn test_by_account_filters_in_order() {
        let ledger = Ledger::new();
        ledger.append(pending("ACC001", TransactionType::Deposit, 100));
        ledger.append(pending("ACC002", TransactionType::Deposit, 200));
        ledger.append(pending("ACC001", TransactionType::Withdrawal, 50));

        let records = ledger.by_account("ACC001");
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.account_number.as_str() == "ACC001"));
        assert_eq!(records[0].transaction_type, TransactionType::Deposit);
        assert_eq!(records[1].transaction_type, TransactionType::Withdrawal);

        assert!(ledger.by_account("").is_empty());
        assert!(ledger.by_account("ACC999").is_empty());
    }

    #[test]
    fn test_by_account_normalizes_query() {
        let ledger = Ledger::new();
        ledger.append(pending("acc001", TransactionType::Deposit, 100));

        assert_eq!(ledger.by_account("acc001").len(), 1);
        assert_eq!(ledger.by_account(" Acc001 "), ledger.by_account("ACC001"));
        assert_eq!(ledger.total_deposits("acc001"), Decimal::from(100));
        assert!(ledger.by_account("   ").is_empty());
    }

    #[test]
    fn test_totals_include_wire_transfers() {
        let ledger = Ledger::new();
        ledger.append(pending("ACC001", TransactionType::Deposit, 100));
        ledger.append(pending("ACC001", TransactionType::WireTransferIn, 40));
        ledger.append(pending("ACC001", TransactionType::Withdrawal, 30));
        ledger.append(pending("ACC001", TransactionType::WireTransferOut, 20));
        ledger.append(pending("ACC002", TransactionType::Deposit, 1000));

        assert_eq!(ledger.total_deposits("ACC001"), Decimal::from(140));
        assert_eq!(ledger.total_withdrawals("ACC001"), Decimal::from(50));
        assert_eq!(ledger.net_change("ACC001"), Decimal::from(90));
        assert_eq!(ledger.total_deposits(""), Decimal::ZERO);
    }

    #[test]
    fn test_append_all_keeps_batch_order() {
        let ledger = Ledger::new();
        let ids = ledger.append_all(vec![
            pending("ACC001", TransactionType::WireTransferOut, 500),
            pending("", TransactionType::Deposit, 1),
            pending("ACC002", TransactionType::WireTransferIn, 500),
        ]);

        assert_eq!(ids, vec![TransactionId::new(1), TransactionId::new(2)]);
        let records = ledger.records();
        assert_eq!(records[0].transaction_type, TransactionType::WireTransferOut);
        assert_eq!(records[1].transaction_type, TransactionType::WireTransferIn);
    }

    #[test]
    fn test_restore_resumes_sequence() {
        let original = Ledger::new();
        original.append(pending("ACC001", TransactionType::Deposit, 100));
        original.append(pending("ACC001", TransactionType::Deposit, 100));

        let restored = Ledger::restore(original.records());
        let next = restored.append(pending("ACC001", TransactionType::Withdrawal, 10));

        assert_eq!(next, Some(TransactionId::new(3)));
        assert_eq!(restored.len(), 3);
    }

    #[test]
    fn test_concurrent_appends() {
        let ledger = Ledger::new();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let ledger = &ledger;
                scope.spawn(move || {
                    for _ in 0..250 {
                        ledger.append(pending("ACC001", TransactionType::Deposit, 1));
                    }
                });
            }
        });

        let records = ledger.records();
        assert_eq!(records.len(), 2000);
        assert!(records.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(ledger.total_deposits("ACC001"), Decimal::from(2000));
    }

    proptest! {
        /// Deposits minus withdrawals recorded for an account equal the
        /// change in that account's balance.
        #[test]
        fn aggregate_identity(ops in prop::collection::vec((any::<bool>(), 1i64..500i64), 0..80)) {
            use crate::account::{Account, AccountStatus, Operation};
            use crate::balance::AccountKind;
            use crate::customer::{Customer, CustomerTier};
            use std::sync::Arc;
            use tally_common::CustomerId;

            let customer = Arc::new(Customer::new(
                CustomerId::new(1), "Jane Smith", 35, "jane@example.com",
                "987-654-3210", "456 Oak Ave", CustomerTier::Premium,
            ));
            let seed = Decimal::from(1000);
            let account = Account::open(
                AccountNumber::from_sequence(1), customer, AccountKind::default_savings(),
                seed, AccountStatus::Active,
            ).unwrap();
            let ledger = Ledger::new();

            for (is_deposit, amount) in ops {
                let amount = Decimal::from(amount);
                let operation = if is_deposit { Operation::Deposit } else { Operation::Withdrawal };
                if let Ok(balance) = account.process_transaction(amount, operation) {
                    ledger.append(PendingTransaction::new(
                        account.number().clone(), operation.into(), amount, balance,
                    ));
                }
            }

            let number = account.number().as_str();
            prop_assert_eq!(
                ledger.total_deposits(number) - ledger.total_withdrawals(number),
                account.balance() - seed
            );
        }
    }
}

//! Two-account wire transfers.
//!
//! A transfer is two independent critical sections: the withdrawal runs
//! under the source account's lock, which is released before the deposit
//! takes the destination's lock. The two locks are never held together. If
//! the deposit leg fails the source is compensated by re-depositing the
//! amount; no ledger record is written for such an attempt.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use tally_common::{is_positive_amount, AccountNumber, Result, TallyError, TransactionId};
use tally_ledger::{Ledger, Operation, PendingTransaction, Transactable, TransactionType};

use crate::directory::AccountDirectory;
use crate::metrics::TransferMetrics;

const SAME_ACCOUNT_REASON: &str = "Cannot transfer to the same account.";
const ROLLED_BACK_REASON: &str = "Transfer failed during deposit. Transaction rolled back.";

/// Outcome of a completed transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReceipt {
    pub from: AccountNumber,
    pub to: AccountNumber,
    pub amount: Decimal,
    /// Id of the WIRE_TRANSFER_OUT record.
    pub out_id: TransactionId,
    /// Id of the WIRE_TRANSFER_IN record.
    pub in_id: TransactionId,
    /// Source balance right after the withdrawal.
    pub from_balance: Decimal,
    /// Destination balance right after the deposit.
    pub to_balance: Decimal,
}

/// Moves money between two accounts and records it in the ledger.
pub struct TransferCoordinator<D: AccountDirectory> {
    directory: Arc<D>,
    ledger: Arc<Ledger>,
    metrics: Arc<TransferMetrics>,
}

impl<D: AccountDirectory> TransferCoordinator<D> {
    /// Create a coordinator over a directory and ledger.
    pub fn new(directory: Arc<D>, ledger: Arc<Ledger>) -> Self {
        Self {
            directory,
            ledger,
            metrics: Arc::new(TransferMetrics::new()),
        }
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn metrics(&self) -> &Arc<TransferMetrics> {
        &self.metrics
    }

    /// Apply a single deposit or withdrawal to a directory account and
    /// record it. Returns the new balance.
    #[instrument(skip(self))]
    pub fn process_transaction(
        &self,
        account_number: &str,
        amount: Decimal,
        operation: Operation,
    ) -> Result<Decimal> {
        let account = self.directory.resolve(account_number)?;
        let balance = account.process_transaction(amount, operation)?;

        self.ledger.append(PendingTransaction::new(
            account.account_number().clone(),
            operation.into(),
            amount,
            balance,
        ));
        Ok(balance)
    }

    /// Move `amount` from one account to another.
    ///
    /// On success exactly two records are appended together: a
    /// WIRE_TRANSFER_OUT for the source followed by a WIRE_TRANSFER_IN for
    /// the destination. On any failure none are.
    #[instrument(skip_all, fields(from = %from, to = %to, amount = %amount))]
    pub fn wire_transfer(&self, from: &str, to: &str, amount: Decimal) -> Result<TransferReceipt> {
        self.metrics.transfer_attempted();

        if AccountNumber::new(from) == AccountNumber::new(to) {
            return Err(self.reject(TallyError::invalid_amount(amount, SAME_ACCOUNT_REASON)));
        }

        let source = self.directory.resolve(from).map_err(|e| self.reject(e))?;
        let destination = self.directory.resolve(to).map_err(|e| self.reject(e))?;

        if !is_positive_amount(amount) {
            return Err(self.reject(TallyError::non_positive(amount)));
        }

        let from_balance = source
            .process_transaction(amount, Operation::Withdrawal)
            .map_err(|e| self.reject(e))?;

        let to_balance = match destination.process_transaction(amount, Operation::Deposit) {
            Ok(balance) => balance,
            Err(deposit_error) => {
                self.compensate(&source, amount, &deposit_error);
                return Err(TallyError::invalid_amount(amount, ROLLED_BACK_REASON));
            }
        };

        let ids = self.ledger.append_all([
            PendingTransaction::new(
                source.account_number().clone(),
                TransactionType::WireTransferOut,
                amount,
                from_balance,
            ),
            PendingTransaction::new(
                destination.account_number().clone(),
                TransactionType::WireTransferIn,
                amount,
                to_balance,
            ),
        ]);

        let (out_id, in_id) = match ids.as_slice() {
            &[out_id, in_id] => (out_id, in_id),
            _ => {
                error!(recorded = ids.len(), "Ledger refused transfer records");
                return Err(TallyError::InvalidAccount(source.account_number().to_string()));
            }
        };

        self.metrics.transfer_completed();
        info!(
            out_id = %out_id,
            in_id = %in_id,
            from_balance = %from_balance,
            to_balance = %to_balance,
            "Transfer completed"
        );

        Ok(TransferReceipt {
            from: source.account_number().clone(),
            to: destination.account_number().clone(),
            amount,
            out_id,
            in_id,
            from_balance,
            to_balance,
        })
    }

    fn reject(&self, err: TallyError) -> TallyError {
        self.metrics.transfer_rejected();
        warn!(code = err.error_code(), error = %err, "Transfer rejected");
        err
    }

    fn compensate(&self, source: &D::Account, amount: Decimal, cause: &TallyError) {
        self.metrics.transfer_rolled_back();
        warn!(error = %cause, "Deposit leg failed, re-depositing into source");

        if let Err(e) = source.process_transaction(amount, Operation::Deposit) {
            error!(
                account = %source.account_number(),
                error = %e,
                "Compensating deposit failed"
            );
        }
    }
}

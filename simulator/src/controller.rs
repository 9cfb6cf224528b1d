//! Concurrent workload runner.
//!
//! Workers run on the blocking pool and call straight into the accounts, so
//! every operation goes through the account's own lock. Single-account runs
//! buffer their ledger records behind a separate mutex and append them in
//! one batch once every worker has finished.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use tally_common::AccountNumber;
use tally_coordinator::AccountDirectory;
use tally_ledger::{Operation, PendingTransaction};

use crate::bank::SimulatedBank;
use crate::metrics::{Counterpart, WorkerTally, WorkloadReport};
use crate::scenario::{Scenario, ScenarioStep};

/// Operations each worker performs in a mixed run.
pub const MIXED_OPS_PER_WORKER: usize = 10;

/// Runner settings shared by every run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Fixed amount moved by every operation.
    pub amount: Decimal,
    /// Pause after each operation.
    pub op_delay: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            amount: Decimal::from(10),
            op_delay: Duration::ZERO,
        }
    }
}

/// Drives concurrent workers against the accounts of a simulated bank.
pub struct WorkloadRunner {
    bank: Arc<SimulatedBank>,
    config: RunnerConfig,
}

impl WorkloadRunner {
    pub fn new(bank: Arc<SimulatedBank>, config: RunnerConfig) -> Self {
        Self { bank, config }
    }

    pub fn bank(&self) -> &Arc<SimulatedBank> {
        &self.bank
    }

    /// Each worker alternates deposits and withdrawals on one account,
    /// starting with a deposit when `worker + op` is even.
    #[instrument(skip(self))]
    pub async fn run_uniform(
        &self,
        account_number: &str,
        workers: usize,
        ops_per_worker: usize,
    ) -> anyhow::Result<WorkloadReport> {
        self.run_on_account("uniform", account_number, workers, ops_per_worker, |worker, op| {
            if (worker + op) % 2 == 0 {
                Operation::Deposit
            } else {
                Operation::Withdrawal
            }
        })
        .await
    }

    /// Even-numbered workers only deposit, odd-numbered workers only
    /// withdraw. Each worker performs [`MIXED_OPS_PER_WORKER`] operations.
    #[instrument(skip(self))]
    pub async fn run_mixed(&self, account_number: &str, workers: usize) -> anyhow::Result<WorkloadReport> {
        self.run_on_account("mixed", account_number, workers, MIXED_OPS_PER_WORKER, |worker, _| {
            if worker % 2 == 0 {
                Operation::Deposit
            } else {
                Operation::Withdrawal
            }
        })
        .await
    }

    /// Workers alternate `a -> b` and `b -> a` wire transfers. The report
    /// watches `a`; `b` is carried as the counterpart.
    #[instrument(skip(self))]
    pub async fn run_transfers(
        &self,
        a: &str,
        b: &str,
        workers: usize,
        ops_per_worker: usize,
    ) -> anyhow::Result<WorkloadReport> {
        let directory = self.bank.directory();
        let ledger = self.bank.ledger();
        let first = directory.resolve(a)?;
        let second = directory.resolve(b)?;
        if first.number() == second.number() {
            bail!("transfer run needs two distinct accounts, got {} twice", first.number());
        }

        let first_floor = first.kind().floor();
        let second_floor = second.kind().floor();
        let start_a = first.balance();
        let start_b = second.balance();
        let net_before = ledger.net_change(first.number().as_str());
        let records_before = ledger.len();
        let tally = Arc::new(WorkerTally::new());
        let amount = self.config.amount;
        let delay = self.config.op_delay;

        info!(workers, ops_per_worker, amount = %amount, "Starting transfer workload");
        let started = Instant::now();

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let coordinator = self.bank.coordinator().clone();
            let tally = tally.clone();
            let a = first.number().clone();
            let b = second.number().clone();

            handles.push(tokio::task::spawn_blocking(move || {
                for op in 0..ops_per_worker {
                    let outbound = (worker + op) % 2 == 0;
                    let (from, to, from_floor, to_floor) = if outbound {
                        (&a, &b, first_floor, second_floor)
                    } else {
                        (&b, &a, second_floor, first_floor)
                    };

                    match coordinator.wire_transfer(from.as_str(), to.as_str(), amount) {
                        Ok(receipt) => {
                            if receipt.from_balance < from_floor || receipt.to_balance < to_floor {
                                tally.record_floor_violation();
                            }
                            if outbound {
                                tally.record_debit();
                            } else {
                                tally.record_credit();
                            }
                        }
                        Err(e) => {
                            debug!(worker, op, error = %e, "Transfer rejected");
                            tally.record_failure(&e);
                        }
                    }

                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
            }));
        }

        for handle in handles {
            handle.await.context("transfer worker panicked")?;
        }

        let report = WorkloadReport {
            workload: "transfers".to_string(),
            account: first.number().clone(),
            workers,
            ops_per_worker,
            amount,
            credits: tally.credits(),
            debits: tally.debits(),
            failures: tally.failures(),
            policy_rejections: tally.policy_rejections(),
            floor_violations: tally.floor_violations(),
            start_balance: start_a,
            end_balance: first.balance(),
            records_appended: (ledger.len() - records_before) as u64,
            records_per_success: 2,
            ledger_net_change: ledger.net_change(first.number().as_str()) - net_before,
            counterpart: Some(Counterpart {
                account: second.number().clone(),
                start_balance: start_b,
                end_balance: second.balance(),
            }),
            elapsed: started.elapsed(),
        };

        log_report(&report);
        Ok(report)
    }

    /// Execute every step of a scenario, returning the report of each run.
    /// A failed assertion stops the scenario.
    pub async fn run_scenario(&self, scenario: &Scenario) -> anyhow::Result<Vec<WorkloadReport>> {
        info!(scenario = %scenario.name, description = %scenario.description, "Running scenario");

        let mut reports = Vec::new();
        for step in &scenario.steps {
            if let Some(report) = self.execute_step(step).await? {
                reports.push(report);
            }
        }

        Ok(reports)
    }

    async fn execute_step(&self, step: &ScenarioStep) -> anyhow::Result<Option<WorkloadReport>> {
        match step {
            ScenarioStep::OpenAccount {
                account_type,
                balance,
            } => {
                let account = self.bank.open_account(*account_type, *balance)?;
                info!(account = %account.number(), kind = account.kind_name(), "Opened account");
                Ok(None)
            }
            ScenarioStep::RunUniform {
                account,
                workers,
                ops_per_worker,
            } => Ok(Some(self.run_uniform(account, *workers, *ops_per_worker).await?)),
            ScenarioStep::RunMixed { account, workers } => {
                Ok(Some(self.run_mixed(account, *workers).await?))
            }
            ScenarioStep::RunTransfers {
                from,
                to,
                workers,
                ops_per_worker,
            } => Ok(Some(self.run_transfers(from, to, *workers, *ops_per_worker).await?)),
            ScenarioStep::AssertBalance { account, balance } => {
                let actual = self.bank.directory().resolve(account)?.balance();
                if actual != *balance {
                    bail!("balance of {account} is {actual}, expected {balance}");
                }
                info!(account = %account, balance = %actual, "Balance assertion passed");
                Ok(None)
            }
            ScenarioStep::AssertLedgerCount { count } => {
                let actual = self.bank.ledger().len();
                if actual != *count {
                    bail!("ledger holds {actual} records, expected {count}");
                }
                info!(records = actual, "Ledger count assertion passed");
                Ok(None)
            }
        }
    }

    async fn run_on_account<F>(
        &self,
        workload: &str,
        account_number: &str,
        workers: usize,
        ops_per_worker: usize,
        plan: F,
    ) -> anyhow::Result<WorkloadReport>
    where
        F: Fn(usize, usize) -> Operation + Copy + Send + 'static,
    {
        let account = self.bank.directory().resolve(account_number)?;
        let ledger = self.bank.ledger();
        let number: AccountNumber = account.number().clone();
        let floor = account.kind().floor();
        let start_balance = account.balance();
        let net_before = ledger.net_change(number.as_str());
        let buffer: Arc<Mutex<Vec<PendingTransaction>>> = Arc::new(Mutex::new(Vec::new()));
        let tally = Arc::new(WorkerTally::new());
        let amount = self.config.amount;
        let delay = self.config.op_delay;

        info!(
            workload,
            account = %number,
            workers,
            ops_per_worker,
            amount = %amount,
            "Starting workload"
        );
        let started = Instant::now();

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let account = account.clone();
            let buffer = buffer.clone();
            let tally = tally.clone();

            handles.push(tokio::task::spawn_blocking(move || {
                for op in 0..ops_per_worker {
                    let operation = plan(worker, op);

                    match account.process_transaction(amount, operation) {
                        Ok(balance) => {
                            if balance < floor {
                                tally.record_floor_violation();
                            }
                            match operation {
                                Operation::Deposit => tally.record_credit(),
                                Operation::Withdrawal => tally.record_debit(),
                            }
                            buffer.lock().push(PendingTransaction::new(
                                account.number().clone(),
                                operation.into(),
                                amount,
                                balance,
                            ));
                        }
                        Err(e) => {
                            debug!(worker, op, %operation, error = %e, "Operation rejected");
                            tally.record_failure(&e);
                        }
                    }

                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
            }));
        }

        for handle in handles {
            handle.await.context("workload worker panicked")?;
        }

        let batch = std::mem::take(&mut *buffer.lock());
        let appended = ledger.append_all(batch);

        let report = WorkloadReport {
            workload: workload.to_string(),
            account: number.clone(),
            workers,
            ops_per_worker,
            amount,
            credits: tally.credits(),
            debits: tally.debits(),
            failures: tally.failures(),
            policy_rejections: tally.policy_rejections(),
            floor_violations: tally.floor_violations(),
            start_balance,
            end_balance: account.balance(),
            records_appended: appended.len() as u64,
            records_per_success: 1,
            ledger_net_change: ledger.net_change(number.as_str()) - net_before,
            counterpart: None,
            elapsed: started.elapsed(),
        };

        log_report(&report);
        Ok(report)
    }
}

fn log_report(report: &WorkloadReport) {
    info!(
        workload = %report.workload,
        account = %report.account,
        successes = report.successes(),
        failures = report.failures,
        start_balance = %report.start_balance,
        end_balance = %report.end_balance,
        expected_balance = %report.expected_balance(),
        records = report.records_appended,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Workload finished"
    );

    if !report.is_consistent() {
        warn!(workload = %report.workload, account = %report.account, "Workload is inconsistent");
    }
}

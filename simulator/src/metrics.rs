//! Workload counters and run reports.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use tally_common::{AccountNumber, TallyError};

/// Counters shared by the workers of one run.
#[derive(Debug, Default)]
pub struct WorkerTally {
    credits: AtomicU64,
    debits: AtomicU64,
    failures: AtomicU64,
    policy_rejections: AtomicU64,
    floor_violations: AtomicU64,
}

impl WorkerTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful operation that added money to the watched account.
    pub fn record_credit(&self) {
        self.credits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful operation that took money from the watched account.
    pub fn record_debit(&self) {
        self.debits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected operation.
    pub fn record_failure(&self, error: &TallyError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        if error.is_policy_rejection() {
            self.policy_rejections.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a post-operation balance below the account's floor.
    pub fn record_floor_violation(&self) {
        self.floor_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn credits(&self) -> u64 {
        self.credits.load(Ordering::Relaxed)
    }

    pub fn debits(&self) -> u64 {
        self.debits.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn policy_rejections(&self) -> u64 {
        self.policy_rejections.load(Ordering::Relaxed)
    }

    pub fn floor_violations(&self) -> u64 {
        self.floor_violations.load(Ordering::Relaxed)
    }
}

/// Balances of the second account in a transfer run.
#[derive(Debug, Clone, Serialize)]
pub struct Counterpart {
    pub account: AccountNumber,
    pub start_balance: Decimal,
    pub end_balance: Decimal,
}

/// Outcome of one workload run against a watched account.
///
/// `credits` and `debits` count successful operations by their effect on
/// the watched account. For transfer runs a credit is a transfer into it.
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadReport {
    pub workload: String,
    pub account: AccountNumber,
    pub workers: usize,
    pub ops_per_worker: usize,
    pub amount: Decimal,
    pub credits: u64,
    pub debits: u64,
    pub failures: u64,
    pub policy_rejections: u64,
    pub floor_violations: u64,
    pub start_balance: Decimal,
    pub end_balance: Decimal,
    /// Ledger records written by the run.
    pub records_appended: u64,
    /// Ledger records each successful operation produces.
    pub records_per_success: u64,
    /// Ledger net change of the watched account over the run.
    pub ledger_net_change: Decimal,
    pub counterpart: Option<Counterpart>,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl WorkloadReport {
    /// Successful operations.
    pub fn successes(&self) -> u64 {
        self.credits + self.debits
    }

    /// Operations attempted.
    pub fn attempted(&self) -> u64 {
        self.successes() + self.failures
    }

    /// `start + (credits - debits) * amount`.
    pub fn expected_balance(&self) -> Decimal {
        let net = Decimal::from(self.credits) - Decimal::from(self.debits);
        self.start_balance + net * self.amount
    }

    /// Whether the money moved by this run is conserved across both
    /// accounts. Always true for single-account runs.
    pub fn is_conserved(&self) -> bool {
        match &self.counterpart {
            Some(other) => {
                self.start_balance + other.start_balance == self.end_balance + other.end_balance
            }
            None => true,
        }
    }

    /// Final balance, ledger and floor all agree with the counted outcomes.
    pub fn is_consistent(&self) -> bool {
        self.end_balance == self.expected_balance()
            && self.records_appended == self.successes() * self.records_per_success
            && self.ledger_net_change == self.end_balance - self.start_balance
            && self.floor_violations == 0
            && self.is_conserved()
    }

    /// Get success rate.
    pub fn success_rate(&self) -> f64 {
        if self.attempted() == 0 {
            return 0.0;
        }

        self.successes() as f64 / self.attempted() as f64
    }

    /// Operations per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }

        self.attempted() as f64 / secs
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

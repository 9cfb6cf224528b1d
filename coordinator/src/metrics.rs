//! Transfer counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Wire-transfer metrics.
#[derive(Debug, Default)]
pub struct TransferMetrics {
    /// Transfers requested.
    pub attempted: AtomicU64,
    /// Transfers that moved money and wrote both records.
    pub completed: AtomicU64,
    /// Transfers refused before or at the withdrawal leg.
    pub rejected: AtomicU64,
    /// Transfers undone by re-depositing into the source.
    pub rolled_back: AtomicU64,
}

impl TransferMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transfer_attempted(&self) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transfer_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transfer_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transfer_rolled_back(&self) {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> TransferMetricsSnapshot {
        TransferMetricsSnapshot {
            attempted: self.attempted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP tally_transfers_attempted Total wire transfers requested
# TYPE tally_transfers_attempted counter
tally_transfers_attempted {}

# HELP tally_transfers_completed Total wire transfers completed
# TYPE tally_transfers_completed counter
tally_transfers_completed {}

# HELP tally_transfers_rejected Total wire transfers rejected
# TYPE tally_transfers_rejected counter
tally_transfers_rejected {}

# HELP tally_transfers_rolled_back Total wire transfers compensated after a failed deposit
# TYPE tally_transfers_rolled_back counter
tally_transfers_rolled_back {}
"#,
            snapshot.attempted, snapshot.completed, snapshot.rejected, snapshot.rolled_back,
        )
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferMetricsSnapshot {
    pub attempted: u64,
    pub completed: u64,
    pub rejected: u64,
    pub rolled_back: u64,
}

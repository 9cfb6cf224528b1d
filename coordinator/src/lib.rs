//! Tally Coordinator
//!
//! Resolves account numbers to accounts and moves money between two
//! accounts, compensating the source when the deposit leg fails.

pub mod config;
pub mod coordinator;
pub mod directory;
pub mod metrics;

pub use config::{CoordinatorConfig, PolicyConfig};
pub use coordinator::{TransferCoordinator, TransferReceipt};
pub use directory::{AccountDirectory, InMemoryDirectory};
pub use metrics::{TransferMetrics, TransferMetricsSnapshot};

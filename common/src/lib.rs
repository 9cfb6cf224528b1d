//! Tally Common Types
//!
//! Shared types used across the Tally workspace: account, customer and
//! transaction identifiers, the sequence generator that mints them, money
//! helpers, and the error type every balance operation reports.

pub mod identifiers;
pub mod monetary;
pub mod error;

pub use identifiers::*;
pub use monetary::*;
pub use error::*;

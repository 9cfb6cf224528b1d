//! Customer records referenced by accounts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use tally_common::CustomerId;

/// Email recorded for customers loaded from legacy records that lack one.
pub const UNKNOWN_EMAIL: &str = "unknown@example.com";

/// Customer tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerTier {
    /// Standard customer.
    Regular,
    /// Premium customer; monthly fees are waived.
    Premium,
}

impl CustomerTier {
    /// Whether monthly fees are waived for this tier.
    pub fn waives_fees(&self) -> bool {
        matches!(self, CustomerTier::Premium)
    }
}

impl fmt::Display for CustomerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerTier::Regular => write!(f, "Regular"),
            CustomerTier::Premium => write!(f, "Premium"),
        }
    }
}

impl FromStr for CustomerTier {
    type Err = std::convert::Infallible;

    /// Anything other than `premium` (any case) is a regular customer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("premium") {
            Ok(CustomerTier::Premium)
        } else {
            Ok(CustomerTier::Regular)
        }
    }
}

/// A customer. The core only reads it; its lifecycle is managed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub age: u32,
    pub email: String,
    pub contact: String,
    pub address: String,
    pub tier: CustomerTier,
}

impl Customer {
    /// Create a new customer.
    pub fn new(
        id: CustomerId,
        name: impl Into<String>,
        age: u32,
        email: impl Into<String>,
        contact: impl Into<String>,
        address: impl Into<String>,
        tier: CustomerTier,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            age,
            email: email.into(),
            contact: contact.into(),
            address: address.into(),
            tier,
        }
    }
}

//! Workload scenarios.

use std::path::Path;

use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account type of an opened account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Savings,
    Checking,
}

/// A workload scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// A step in a scenario. Accounts opened by a scenario are numbered
/// `ACC001`, `ACC002`, ... in the order they are opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScenarioStep {
    /// Open an account.
    OpenAccount {
        account_type: AccountType,
        balance: Decimal,
    },
    /// Alternating deposits and withdrawals on one account.
    RunUniform {
        account: String,
        workers: usize,
        ops_per_worker: usize,
    },
    /// Depositor and withdrawer workers on one account.
    RunMixed { account: String, workers: usize },
    /// Opposing wire transfers between two accounts.
    RunTransfers {
        from: String,
        to: String,
        workers: usize,
        ops_per_worker: usize,
    },
    /// Fail unless the account holds exactly this balance.
    AssertBalance { account: String, balance: Decimal },
    /// Fail unless the ledger holds exactly this many records.
    AssertLedgerCount { count: usize },
}

impl Scenario {
    const BUILTIN: [&'static str; 4] = ["uniform", "mixed", "transfers", "savings-floor"];

    /// Names accepted by [`Scenario::load`].
    pub fn builtin_names() -> &'static [&'static str] {
        &Self::BUILTIN
    }

    /// Load a scenario by name.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "uniform" => Ok(Self::uniform()),
            "mixed" => Ok(Self::mixed()),
            "transfers" => Ok(Self::transfers()),
            "savings-floor" => Ok(Self::savings_floor()),
            _ => Err(anyhow::anyhow!(
                "Unknown scenario: {} (expected one of: {})",
                name,
                Self::builtin_names().join(", ")
            )),
        }
    }

    /// Load a scenario from a JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario file {}", path.display()))?;
        Self::from_json(&text)
    }

    /// Parse a scenario from JSON.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("parsing scenario")
    }

    /// 10 workers x 20 alternating operations on a checking account.
    /// With the default amount of 10 nothing is rejected.
    fn uniform() -> Self {
        Self {
            name: "uniform".to_string(),
            description: "Alternating deposits and withdrawals on one checking account".to_string(),
            steps: vec![
                ScenarioStep::OpenAccount {
                    account_type: AccountType::Checking,
                    balance: Decimal::from(1000),
                },
                ScenarioStep::RunUniform {
                    account: "ACC001".to_string(),
                    workers: 10,
                    ops_per_worker: 20,
                },
                ScenarioStep::AssertBalance {
                    account: "ACC001".to_string(),
                    balance: Decimal::from(1000),
                },
                ScenarioStep::AssertLedgerCount { count: 200 },
            ],
        }
    }

    /// 5 depositors and 5 withdrawers on a checking account.
    fn mixed() -> Self {
        Self {
            name: "mixed".to_string(),
            description: "Depositor and withdrawer workers on one checking account".to_string(),
            steps: vec![
                ScenarioStep::OpenAccount {
                    account_type: AccountType::Checking,
                    balance: Decimal::from(1000),
                },
                ScenarioStep::RunMixed {
                    account: "ACC001".to_string(),
                    workers: 10,
                },
                ScenarioStep::AssertBalance {
                    account: "ACC001".to_string(),
                    balance: Decimal::from(1000),
                },
                ScenarioStep::AssertLedgerCount { count: 100 },
            ],
        }
    }

    /// Opposing transfers between two checking accounts.
    fn transfers() -> Self {
        Self {
            name: "transfers".to_string(),
            description: "Opposing wire transfers between two checking accounts".to_string(),
            steps: vec![
                ScenarioStep::OpenAccount {
                    account_type: AccountType::Checking,
                    balance: Decimal::from(2000),
                },
                ScenarioStep::OpenAccount {
                    account_type: AccountType::Checking,
                    balance: Decimal::from(1000),
                },
                ScenarioStep::RunTransfers {
                    from: "ACC001".to_string(),
                    to: "ACC002".to_string(),
                    workers: 8,
                    ops_per_worker: 24,
                },
                ScenarioStep::AssertBalance {
                    account: "ACC001".to_string(),
                    balance: Decimal::from(2000),
                },
                ScenarioStep::AssertBalance {
                    account: "ACC002".to_string(),
                    balance: Decimal::from(1000),
                },
                ScenarioStep::AssertLedgerCount { count: 384 },
            ],
        }
    }

    /// Withdrawers race depositors on a savings account opened just above
    /// its minimum balance; some withdrawals are expected to be refused.
    fn savings_floor() -> Self {
        Self {
            name: "savings-floor".to_string(),
            description: "Withdrawals racing deposits near the savings minimum balance".to_string(),
            steps: vec![
                ScenarioStep::OpenAccount {
                    account_type: AccountType::Savings,
                    balance: Decimal::from(600),
                },
                ScenarioStep::RunMixed {
                    account: "ACC001".to_string(),
                    workers: 10,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scenarios_load() {
        for name in Scenario::builtin_names() {
            let scenario = Scenario::load(name).unwrap();
            assert_eq!(scenario.name, *name);
            assert!(!scenario.steps.is_empty());
        }
        assert!(Scenario::load("high-volume").is_err());
    }

    #[test]
    fn test_scenario_from_json() {
        let scenario = Scenario::from_json(
            r#"{
                "name": "custom",
                "steps": [
                    {"OpenAccount": {"account_type": "savings", "balance": "1500"}},
                    {"RunUniform": {"account": "ACC001", "workers": 4, "ops_per_worker": 10}},
                    {"AssertLedgerCount": {"count": 40}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(scenario.name, "custom");
        assert!(scenario.description.is_empty());
        assert!(matches!(
            scenario.steps[0],
            ScenarioStep::OpenAccount { account_type: AccountType::Savings, balance } if balance == Decimal::from(1500)
        ));
        assert!(matches!(scenario.steps[2], ScenarioStep::AssertLedgerCount { count: 40 }));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(Scenario::from_json(r#"{"name": "x", "steps": [{"Explode": {}}]}"#).is_err());
    }
}

//! Tally Simulator
//!
//! Runs concurrent workloads against simulated accounts and checks that
//! balances and the ledger stay consistent.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod bank;
mod controller;
mod metrics;
mod scenario;

use tally_coordinator::CoordinatorConfig;
use tally_ledger::FlatFileStore;

use bank::SimulatedBank;
use controller::{RunnerConfig, WorkloadRunner};
use metrics::WorkloadReport;
use scenario::{AccountType, Scenario};

/// Workload to run when no scenario is given.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Workload {
    Uniform,
    Mixed,
    Transfers,
}

/// Tally Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Concurrent workload runner for Tally accounts")]
struct Args {
    /// Built-in scenario to run (uniform, mixed, transfers, savings-floor)
    #[arg(short, long, conflicts_with = "scenario_file")]
    scenario: Option<String>,

    /// JSON scenario file to run
    #[arg(long)]
    scenario_file: Option<PathBuf>,

    /// Workload to run when no scenario is given
    #[arg(short, long, value_enum, default_value = "uniform")]
    workload: Workload,

    /// Number of concurrent workers
    #[arg(long, default_value = "10")]
    workers: usize,

    /// Operations per worker (mixed runs always use 10)
    #[arg(long, default_value = "20")]
    ops: usize,

    /// Amount moved by every operation
    #[arg(long, default_value = "10")]
    amount: Decimal,

    /// Opening balance of each account the workload creates
    #[arg(long, default_value = "1000")]
    balance: Decimal,

    /// Type of the accounts the workload creates
    #[arg(long, value_enum, default_value = "checking")]
    account_type: AccountType,

    /// Pause after each operation, in milliseconds
    #[arg(long, default_value = "0")]
    delay_ms: u64,

    /// Load accounts and ledger from the data directory first and save them back afterwards
    #[arg(long)]
    persist: bool,

    /// Data directory, overriding TALLY_DATA_DIR (implies --persist)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = CoordinatorConfig::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
    );
    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let run_id = uuid::Uuid::new_v4();
    run(args, config)
        .instrument(info_span!("simulation", run_id = %run_id))
        .await
}

async fn run(args: Args, config: CoordinatorConfig) -> anyhow::Result<()> {
    info!("Starting Tally Simulator");

    let store = if args.persist || args.data_dir.is_some() {
        let dir = args.data_dir.clone().unwrap_or_else(|| config.data_dir.clone());
        Some(FlatFileStore::new(dir))
    } else {
        None
    };
    let bank = match &store {
        Some(store) => SimulatedBank::load(config.policy.clone(), store)?,
        None => SimulatedBank::new(config.policy.clone()),
    };

    let runner = WorkloadRunner::new(
        Arc::new(bank),
        RunnerConfig {
            amount: args.amount,
            op_delay: Duration::from_millis(args.delay_ms),
        },
    );

    let scenario = match (&args.scenario, &args.scenario_file) {
        (Some(name), _) => Some(Scenario::load(name)?),
        (None, Some(path)) => Some(Scenario::from_file(path)?),
        (None, None) => None,
    };

    let reports = match scenario {
        Some(scenario) => runner.run_scenario(&scenario).await?,
        None => vec![run_workload(&runner, &args).await?],
    };

    for report in &reports {
        println!("{}", serde_json::to_string_pretty(report)?);
    }

    if let Some(store) = &store {
        runner.bank().save(store)?;
        info!(accounts = %store.accounts_path().display(), "State saved");
    }

    let inconsistent = reports.iter().filter(|r| !r.is_consistent()).count();
    info!(
        runs = reports.len(),
        inconsistent,
        transfers = ?runner.bank().coordinator().metrics().snapshot(),
        "Simulation complete"
    );

    if inconsistent > 0 {
        anyhow::bail!("{inconsistent} workload run(s) were inconsistent");
    }
    Ok(())
}

async fn run_workload(runner: &WorkloadRunner, args: &Args) -> anyhow::Result<WorkloadReport> {
    let bank = runner.bank();
    let first = bank.open_account(args.account_type, args.balance)?;
    let number = first.number().as_str();

    match args.workload {
        Workload::Uniform => runner.run_uniform(number, args.workers, args.ops).await,
        Workload::Mixed => runner.run_mixed(number, args.workers).await,
        Workload::Transfers => {
            let second = bank.open_account(args.account_type, args.balance)?;
            runner
                .run_transfers(number, second.number().as_str(), args.workers, args.ops)
                .await
        }
    }
}

//! Forklock Simulator CLI
//!
//! Runs a deterministic fork mutex cluster under a lock workload and prints
//! acquisition latency statistics.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use forklock_simulator::{Simulator, SimulatorConfig};
use forklock_types::ForkPriority;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "forklock-sim")]
#[command(about = "Deterministic simulator for the fork mutex protocol")]
#[command(version)]
struct Cli {
    /// TOML config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of processes
    #[arg(short = 'n', long)]
    processes: Option<u32>,

    /// Lock requests issued by each process
    #[arg(short, long)]
    requests: Option<u32>,

    /// Initial fork assignment
    #[arg(long, value_enum)]
    priority: Option<PriorityArg>,

    /// Time spent in the critical section, in milliseconds
    #[arg(long)]
    hold_ms: Option<u64>,

    /// Minimum message latency, in milliseconds
    #[arg(long)]
    min_latency_ms: Option<u64>,

    /// Maximum message latency, in milliseconds
    #[arg(long)]
    max_latency_ms: Option<u64>,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PriorityArg {
    /// The lower id of each pair starts with the fork
    LowerIdHolds,
    /// The higher id of each pair starts with the fork
    HigherIdHolds,
}

impl From<PriorityArg> for ForkPriority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::LowerIdHolds => ForkPriority::LowerIdHolds,
            PriorityArg::HigherIdHolds => ForkPriority::HigherIdHolds,
        }
    }
}

impl Cli {
    fn into_config(self) -> anyhow::Result<SimulatorConfig> {
        let mut config = match &self.config {
            Some(path) => SimulatorConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SimulatorConfig::default(),
        };

        if let Some(processes) = self.processes {
            config.num_processes = processes;
        }
        if let Some(requests) = self.requests {
            config.workload.requests_per_process = requests;
        }
        if let Some(priority) = self.priority {
            config.priority = priority.into();
        }
        if let Some(hold) = self.hold_ms {
            config.workload.hold_time = Duration::from_millis(hold);
        }
        if let Some(min) = self.min_latency_ms {
            config.min_latency = Duration::from_millis(min);
        }
        if let Some(max) = self.max_latency_ms {
            config.max_latency = Duration::from_millis(max);
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;
    let config = cli.into_config()?;

    info!(
        processes = config.num_processes,
        requests = config.workload.requests_per_process,
        seed = config.seed,
        "Configured simulator"
    );

    let report = Simulator::new(config)?.run().context("simulation failed")?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        report.print();
    }

    Ok(())
}

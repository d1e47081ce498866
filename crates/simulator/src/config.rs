//! Configuration types for the simulator.

use forklock_mutex::MutexConfig;
use forklock_simulation::{NetworkConfig, SimulationConfig, WorkloadPlan};
use forklock_types::ForkPriority;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating a simulator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config parsed but describes an impossible run.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for a simulation run.
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// Number of processes in the cluster.
    pub num_processes: u32,

    /// Identifier of the first process.
    pub first_process_id: u64,

    /// Initial fork assignment.
    pub priority: ForkPriority,

    /// Minimum one-way message latency.
    pub min_latency: Duration,

    /// Maximum one-way message latency.
    pub max_latency: Duration,

    /// Application workload.
    pub workload: WorkloadPlan,

    /// Event limit before the run is declared stuck.
    pub max_events: u64,

    /// Random seed for deterministic simulation.
    pub seed: u64,
}

impl SimulatorConfig {
    /// Create a new simulator configuration.
    pub fn new(num_processes: u32) -> Self {
        let network = NetworkConfig::default();
        Self {
            num_processes,
            first_process_id: network.first_process_id,
            priority: ForkPriority::default(),
            min_latency: network.min_latency,
            max_latency: network.max_latency,
            workload: WorkloadPlan::default(),
            max_events: SimulationConfig::default().max_events,
            seed: 12345,
        }
    }

    /// Load a configuration from a TOML file.
    ///
    /// Keys missing from the file keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(contents)?;
        let config = file.apply(Self::default());
        config.validate()?;
        Ok(config)
    }

    /// Set the number of processes.
    pub fn with_num_processes(mut self, num_processes: u32) -> Self {
        self.num_processes = num_processes;
        self
    }

    /// Set the initial fork assignment.
    pub fn with_priority(mut self, priority: ForkPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the latency range.
    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        self.min_latency = min;
        self.max_latency = max;
        self
    }

    /// Set the number of lock requests per process.
    pub fn with_requests_per_process(mut self, requests: u32) -> Self {
        self.workload.requests_per_process = requests;
        self
    }

    /// Set the time spent inside the critical section.
    pub fn with_hold_time(mut self, hold_time: Duration) -> Self {
        self.workload.hold_time = hold_time;
        self
    }

    /// Set the workload.
    pub fn with_workload(mut self, workload: WorkloadPlan) -> Self {
        self.workload = workload;
        self
    }

    /// Set the event limit.
    pub fn with_max_events(mut self, max_events: u64) -> Self {
        self.max_events = max_events;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Total number of lock requests the workload will issue.
    pub fn total_requests(&self) -> u64 {
        u64::from(self.num_processes) * u64::from(self.workload.requests_per_process)
    }

    /// Check that the configuration describes a runnable cluster.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_processes == 0 {
            return Err(ConfigError::Invalid(
                "cluster needs at least one process".to_string(),
            ));
        }
        if self.min_latency > self.max_latency {
            return Err(ConfigError::Invalid(format!(
                "min latency {:?} exceeds max latency {:?}",
                self.min_latency, self.max_latency
            )));
        }
        if self.workload.think_time_min > self.workload.think_time_max {
            return Err(ConfigError::Invalid(format!(
                "min think time {:?} exceeds max think time {:?}",
                self.workload.think_time_min, self.workload.think_time_max
            )));
        }
        if self.first_process_id.checked_add(u64::from(self.num_processes)).is_none() {
            return Err(ConfigError::Invalid(
                "process ids overflow u64".to_string(),
            ));
        }
        Ok(())
    }

    /// Convert to a SimulationConfig for the underlying runner.
    pub fn to_simulation_config(&self) -> SimulationConfig {
        let network = NetworkConfig::new(self.num_processes)
            .with_first_process_id(self.first_process_id)
            .with_latency(self.min_latency, self.max_latency);

        SimulationConfig::new(self.num_processes)
            .with_network(network)
            .with_mutex(MutexConfig::default().with_priority(self.priority))
            .with_workload(self.workload.clone())
            .with_max_events(self.max_events)
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// On-disk form of [`SimulatorConfig`].
///
/// ```toml
/// seed = 42
/// processes = 5
/// priority = "higher-id-holds"
///
/// [network]
/// min_latency_ms = 1
/// max_latency_ms = 10
///
/// [workload]
/// requests_per_process = 20
/// hold_time_ms = 5
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    seed: Option<u64>,
    processes: Option<u32>,
    priority: Option<ForkPriority>,
    max_events: Option<u64>,
    network: NetworkSection,
    workload: WorkloadSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct NetworkSection {
    first_process_id: Option<u64>,
    min_latency_ms: Option<u64>,
    max_latency_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct WorkloadSection {
    requests_per_process: Option<u32>,
    hold_time_ms: Option<u64>,
    think_time_min_ms: Option<u64>,
    think_time_max_ms: Option<u64>,
    start_jitter_ms: Option<u64>,
}

impl ConfigFile {
    fn apply(self, mut config: SimulatorConfig) -> SimulatorConfig {
        let ms = Duration::from_millis;

        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(processes) = self.processes {
            config.num_processes = processes;
        }
        if let Some(priority) = self.priority {
            config.priority = priority;
        }
        if let Some(max_events) = self.max_events {
            config.max_events = max_events;
        }

        let network = self.network;
        if let Some(first) = network.first_process_id {
            config.first_process_id = first;
        }
        if let Some(min) = network.min_latency_ms {
            config.min_latency = ms(min);
        }
        if let Some(max) = network.max_latency_ms {
            config.max_latency = ms(max);
        }

        let workload = self.workload;
        let plan = &mut config.workload;
        if let Some(requests) = workload.requests_per_process {
            plan.requests_per_process = requests;
        }
        if let Some(hold) = workload.hold_time_ms {
            plan.hold_time = ms(hold);
        }
        if let Some(min) = workload.think_time_min_ms {
            plan.think_time_min = ms(min);
        }
        if let Some(max) = workload.think_time_max_ms {
            plan.think_time_max = ms(max);
        }
        if let Some(jitter) = workload.start_jitter_ms {
            plan.start_jitter = ms(jitter);
        }

        config
    }
}

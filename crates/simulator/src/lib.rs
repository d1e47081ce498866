//! Forklock Simulator
//!
//! A workload simulator built on top of the simulation framework. Runs a
//! cluster of fork protocol processes under a configurable lock workload and
//! reports how long processes waited for the critical section.
//!
//! # Architecture
//!
//! The simulator builds on `forklock-simulation` to provide:
//!
//! - **Configuration**: builder or TOML file describing cluster, links and workload
//! - **Metrics Collection**: acquisition latency percentiles, message cost per entry
//! - **Reporting**: human readable summary or JSON
//!
//! # Example
//!
//! ```ignore
//! use forklock_simulator::{Simulator, SimulatorConfig};
//! use std::time::Duration;
//!
//! let config = SimulatorConfig::new(5)
//!     .with_requests_per_process(100)
//!     .with_hold_time(Duration::from_millis(2));
//!
//! let report = Simulator::new(config)?.run()?;
//! println!("P99 wait: {:?}", report.p99_wait());
//! ```

pub mod config;
pub mod metrics;
pub mod runner;

pub use config::{ConfigError, SimulatorConfig};
pub use metrics::{MetricsCollector, SimulationReport};
pub use runner::Simulator;

//! Simulator runner.

use crate::{MetricsCollector, SimulationReport, SimulatorConfig};
use forklock_simulation::{SimulationError, SimulationRunner};
use tracing::info;

/// Runs one configured workload to completion.
pub struct Simulator {
    config: SimulatorConfig,
    runner: SimulationRunner,
}

impl Simulator {
    /// Build the cluster described by `config`.
    pub fn new(config: SimulatorConfig) -> Result<Self, SimulationError> {
        let runner = SimulationRunner::new(config.to_simulation_config(), config.seed)?;
        Ok(Self { config, runner })
    }

    /// Run until every lock request has been served and the cluster is idle.
    pub fn run(&mut self) -> Result<SimulationReport, SimulationError> {
        info!(
            processes = self.config.num_processes,
            priority = ?self.config.priority,
            total_requests = self.config.total_requests(),
            seed = self.config.seed,
            "Starting simulation"
        );

        let stats = self.runner.run_until_quiescent()?.clone();

        let mut metrics = MetricsCollector::new();
        for record in self.runner.records() {
            metrics.record_entry(record);
        }
        let report = metrics.finalize(self.config.num_processes, self.config.seed, &stats);

        info!(
            entries = report.entries,
            p99_wait = ?report.p99_wait(),
            messages_per_entry = report.messages_per_entry,
            "Simulation complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forklock_types::ForkPriority;
    use std::time::Duration;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_run_serves_every_request() {
        let config = SimulatorConfig::new(4)
            .with_requests_per_process(10)
            .with_seed(3);
        let report = Simulator::new(config).unwrap().run().unwrap();

        assert_eq!(report.lock_requests, 40);
        assert_eq!(report.entries, 40);
        assert_eq!(report.requests_sent, report.grants_sent);
        assert_eq!(report.min_entries_per_process, 10);
        assert_eq!(report.max_entries_per_process, 10);
    }

    #[traced_test]
    #[test]
    fn test_same_seed_same_report() {
        let config = SimulatorConfig::new(5)
            .with_priority(ForkPriority::HigherIdHolds)
            .with_latency(Duration::from_millis(1), Duration::from_millis(30))
            .with_seed(8);

        let a = Simulator::new(config.clone()).unwrap().run().unwrap();
        let b = Simulator::new(config).unwrap().run().unwrap();
        assert_eq!(a, b);
    }

    #[traced_test]
    #[test]
    fn test_uncontended_entries_are_free() {
        // A lone process has no peers to ask for forks.
        let config = SimulatorConfig::new(1).with_requests_per_process(4);
        let report = Simulator::new(config).unwrap().run().unwrap();

        assert_eq!(report.entries, 4);
        assert_eq!(report.immediate_entries, 4);
        assert_eq!(report.max_wait_us, 0);
        assert_eq!(report.messages_per_entry, 0.0);
    }
}

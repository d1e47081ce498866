//! Metrics collection and reporting.

use forklock_simulation::{CriticalSectionRecord, SimulationStats};
use hdrhistogram::Histogram;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// Collects acquisition latencies during a run.
///
/// Waits are recorded in microseconds. The histogram grows to fit the
/// longest wait seen.
pub struct MetricsCollector {
    wait_histogram: Histogram<u64>,
    entries_per_process: Vec<(u64, u64)>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            wait_histogram: Histogram::new(3).expect("3 significant figures is a valid precision"),
            entries_per_process: Vec::new(),
        }
    }

    /// Record one pass through the critical section.
    pub fn record_entry(&mut self, record: &CriticalSectionRecord) {
        let micros = record.wait_time().as_micros() as u64;
        if let Err(error) = self.wait_histogram.record(micros) {
            warn!(process = %record.process, micros, ?error, "Failed to record wait time");
        }

        let id = record.process.as_u64();
        match self.entries_per_process.iter_mut().find(|(p, _)| *p == id) {
            Some((_, count)) => *count += 1,
            None => self.entries_per_process.push((id, 1)),
        }
    }

    /// Number of entries recorded.
    pub fn entries(&self) -> u64 {
        self.wait_histogram.len()
    }

    /// Build the final report.
    pub fn finalize(
        self,
        num_processes: u32,
        seed: u64,
        stats: &SimulationStats,
    ) -> SimulationReport {
        let hist = &self.wait_histogram;
        let (mean, p50, p99, max) = if hist.is_empty() {
            (0, 0, 0, 0)
        } else {
            (
                hist.mean().round() as u64,
                hist.value_at_quantile(0.50),
                hist.value_at_quantile(0.99),
                hist.max(),
            )
        };

        let messages_per_entry = if stats.entries == 0 {
            0.0
        } else {
            stats.messages_sent as f64 / stats.entries as f64
        };

        let (min_entries, max_entries) = self
            .entries_per_process
            .iter()
            .map(|&(_, count)| count)
            .fold(None, |acc: Option<(u64, u64)>, c| match acc {
                Some((lo, hi)) => Some((lo.min(c), hi.max(c))),
                None => Some((c, c)),
            })
            .unwrap_or((0, 0));

        SimulationReport {
            num_processes,
            seed,
            events_processed: stats.events_processed,
            lock_requests: stats.lock_requests,
            entries: stats.entries,
            immediate_entries: stats.immediate_entries,
            requests_sent: stats.requests_sent,
            grants_sent: stats.grants_sent,
            messages_per_entry,
            mean_wait_us: mean,
            p50_wait_us: p50,
            p99_wait_us: p99,
            max_wait_us: max,
            min_entries_per_process: min_entries,
            max_entries_per_process: max_entries,
            simulated_time_us: stats.final_time.as_micros() as u64,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Final report from a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationReport {
    /// Cluster size.
    pub num_processes: u32,
    /// Seed the run used.
    pub seed: u64,
    /// Events taken off the queue.
    pub events_processed: u64,
    /// Lock requests issued.
    pub lock_requests: u64,
    /// Critical section entries.
    pub entries: u64,
    /// Entries that needed no messages.
    pub immediate_entries: u64,
    /// Request messages sent.
    pub requests_sent: u64,
    /// Grant messages sent.
    pub grants_sent: u64,
    /// Messages sent per entry.
    pub messages_per_entry: f64,
    /// Mean wait for the critical section, in microseconds.
    pub mean_wait_us: u64,
    /// Median wait, in microseconds.
    pub p50_wait_us: u64,
    /// 99th percentile wait, in microseconds.
    pub p99_wait_us: u64,
    /// Longest wait, in microseconds.
    pub max_wait_us: u64,
    /// Fewest entries by any one process.
    pub min_entries_per_process: u64,
    /// Most entries by any one process.
    pub max_entries_per_process: u64,
    /// Simulated time of the last event, in microseconds.
    pub simulated_time_us: u64,
}

impl SimulationReport {
    /// Mean wait.
    pub fn mean_wait(&self) -> Duration {
        Duration::from_micros(self.mean_wait_us)
    }

    /// Median wait.
    pub fn p50_wait(&self) -> Duration {
        Duration::from_micros(self.p50_wait_us)
    }

    /// 99th percentile wait.
    pub fn p99_wait(&self) -> Duration {
        Duration::from_micros(self.p99_wait_us)
    }

    /// Longest wait.
    pub fn max_wait(&self) -> Duration {
        Duration::from_micros(self.max_wait_us)
    }

    /// Simulated duration of the run.
    pub fn simulated_time(&self) -> Duration {
        Duration::from_micros(self.simulated_time_us)
    }

    /// Serialize the report as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Print a summary of the report.
    pub fn print(&self) {
        println!("\n=== Simulation Report ===");
        println!("Processes:          {}", self.num_processes);
        println!("Seed:               {}", self.seed);
        println!("Simulated time:     {:?}", self.simulated_time());
        println!("Events processed:   {}", self.events_processed);
        println!();
        println!("Lock requests:      {}", self.lock_requests);
        println!("Entries:            {}", self.entries);
        println!("  immediate:        {}", self.immediate_entries);
        println!(
            "  per process:      {}..={}",
            self.min_entries_per_process, self.max_entries_per_process
        );
        println!();
        println!("Requests sent:      {}", self.requests_sent);
        println!("Grants sent:        {}", self.grants_sent);
        println!("Messages per entry: {:.2}", self.messages_per_entry);
        println!();
        println!("Wait (mean):        {:?}", self.mean_wait());
        println!("Wait (p50):         {:?}", self.p50_wait());
        println!("Wait (p99):         {:?}", self.p99_wait());
        println!("Wait (max):         {:?}", self.max_wait());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forklock_types::ProcessId;

    fn record(process: u64, requested_ms: u64, entered_ms: u64) -> CriticalSectionRecord {
        CriticalSectionRecord {
            process: ProcessId(process),
            requested_at: Duration::from_millis(requested_ms),
            entered_at: Duration::from_millis(entered_ms),
            left_at: Some(Duration::from_millis(entered_ms + 1)),
        }
    }

    #[test]
    fn test_empty_report() {
        let report = MetricsCollector::new().finalize(3, 1, &SimulationStats::default());
        assert_eq!(report.entries, 0);
        assert_eq!(report.max_wait_us, 0);
        assert_eq!(report.messages_per_entry, 0.0);
    }

    #[test]
    fn test_wait_percentiles() {
        let mut metrics = MetricsCollector::new();
        metrics.record_entry(&record(1, 0, 0));
        metrics.record_entry(&record(2, 0, 4));
        metrics.record_entry(&record(2, 10, 20));
        assert_eq!(metrics.entries(), 3);

        let stats = SimulationStats {
            entries: 3,
            messages_sent: 6,
            ..Default::default()
        };
        let report = metrics.finalize(2, 7, &stats);

        assert_eq!(report.min_entries_per_process, 1);
        assert_eq!(report.max_entries_per_process, 2);
        assert_eq!(report.messages_per_entry, 2.0);
        // Three significant figures.
        assert!(report.max_wait() >= Duration::from_micros(9_990));
        assert!(report.max_wait() <= Duration::from_micros(10_010));
    }

    #[test]
    fn test_long_waits_are_not_clamped() {
        let mut metrics = MetricsCollector::new();
        metrics.record_entry(&record(1, 0, 3));
        metrics.record_entry(&record(1, 0, 60_000));

        let report = metrics.finalize(1, 0, &SimulationStats::default());
        assert!(report.p50_wait() >= Duration::from_micros(2_995));
        assert!(report.p50_wait() <= Duration::from_micros(3_005));
        assert!(report.max_wait() >= Duration::from_secs(59));
        assert!(report.mean_wait() >= Duration::from_secs(29));
    }

    #[test]
    fn test_report_json() {
        let report = MetricsCollector::new().finalize(3, 1, &SimulationStats::default());
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["num_processes"], 3);
        assert_eq!(json["entries"], 0);
    }
}

//! Simulated point-to-point network.

use crate::NodeIndex;
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for the simulated cluster and its links.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Number of processes in the cluster.
    pub num_processes: u32,

    /// Identifier of the first process; the rest follow contiguously.
    pub first_process_id: u64,

    /// Minimum one-way message latency.
    pub min_latency: Duration,

    /// Maximum one-way message latency.
    pub max_latency: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            num_processes: 3,
            first_process_id: 1,
            min_latency: Duration::from_millis(1),
            max_latency: Duration::from_millis(10),
        }
    }
}

impl NetworkConfig {
    /// Create a config for `num_processes` processes with default latencies.
    pub fn new(num_processes: u32) -> Self {
        Self {
            num_processes,
            ..Default::default()
        }
    }

    /// Set the latency range.
    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        self.min_latency = min.min(max);
        self.max_latency = max.max(min);
        self
    }

    /// Use the same latency for every message.
    pub fn with_fixed_latency(self, latency: Duration) -> Self {
        self.with_latency(latency, latency)
    }

    /// Set the identifier of the first process.
    pub fn with_first_process_id(mut self, first: u64) -> Self {
        self.first_process_id = first;
        self
    }
}

/// Reliable, per-link FIFO network with random latency.
///
/// A message is never scheduled before an earlier message on the same
/// ordered link. Messages on different links may overtake each other.
#[derive(Debug)]
pub struct SimulatedNetwork {
    config: NetworkConfig,
    /// Latest scheduled delivery per (from, to).
    last_delivery: HashMap<(NodeIndex, NodeIndex), Duration>,
}

impl SimulatedNetwork {
    /// Create a new network.
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            last_delivery: HashMap::new(),
        }
    }

    /// Get the network configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Sample a latency from the configured range.
    pub fn sample_latency(&self, rng: &mut impl Rng) -> Duration {
        let min = self.config.min_latency.as_nanos() as u64;
        let max = self.config.max_latency.as_nanos() as u64;
        if min >= max {
            return self.config.min_latency;
        }
        Duration::from_nanos(rng.gen_range(min..=max))
    }

    /// Pick the delivery time of a message sent at `now` from `from` to `to`.
    pub fn delivery_time(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        now: Duration,
        rng: &mut impl Rng,
    ) -> Duration {
        let candidate = now + self.sample_latency(rng);
        let last = self.last_delivery.entry((from, to)).or_insert(Duration::ZERO);
        let at = candidate.max(*last);
        *last = at;
        at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_fixed_latency() {
        let config = NetworkConfig::new(2).with_fixed_latency(Duration::from_millis(3));
        let mut network = SimulatedNetwork::new(config);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let at = network.delivery_time(0, 1, Duration::from_millis(10), &mut rng);
        assert_eq!(at, Duration::from_millis(13));
    }

    #[test]
    fn test_per_link_fifo() {
        let config = NetworkConfig::new(2)
            .with_latency(Duration::from_millis(1), Duration::from_millis(50));
        let mut network = SimulatedNetwork::new(config);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let mut last = Duration::ZERO;
        for step in 0..200u64 {
            let now = Duration::from_micros(step * 100);
            let at = network.delivery_time(0, 1, now, &mut rng);
            assert!(at >= last, "delivery went backwards on a single link");
            assert!(at >= now + Duration::from_millis(1));
            last = at;
        }
    }

    #[test]
    fn test_latency_stays_in_range() {
        let network = SimulatedNetwork::new(
            NetworkConfig::new(2).with_latency(Duration::from_millis(2), Duration::from_millis(4)),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            let latency = network.sample_latency(&mut rng);
            assert!(latency >= Duration::from_millis(2));
            assert!(latency <= Duration::from_millis(4));
        }
    }
}

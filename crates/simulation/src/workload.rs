//! Lock request workload for simulations.

use rand::Rng;
use std::time::Duration;

/// How simulated applications use the critical section.
///
/// Each process issues `requests_per_process` lock requests. The first one
/// fires at a random time within `start_jitter`; each following one fires a
/// random think time after the previous release. Every entry is released
/// `hold_time` after it happens.
#[derive(Debug, Clone)]
pub struct WorkloadPlan {
    /// Lock requests each process issues on its own.
    pub requests_per_process: u32,

    /// Time spent inside the critical section.
    pub hold_time: Duration,

    /// Minimum pause between a release and the next request.
    pub think_time_min: Duration,

    /// Maximum pause between a release and the next request.
    pub think_time_max: Duration,

    /// Spread of the first request across processes.
    pub start_jitter: Duration,
}

impl Default for WorkloadPlan {
    fn default() -> Self {
        Self {
            requests_per_process: 5,
            hold_time: Duration::from_millis(5),
            think_time_min: Duration::ZERO,
            think_time_max: Duration::from_millis(20),
            start_jitter: Duration::from_millis(10),
        }
    }
}

impl WorkloadPlan {
    /// A plan that issues no requests of its own.
    ///
    /// Entries are still released after `hold_time`. Used when a test
    /// schedules every lock request explicitly.
    pub fn manual() -> Self {
        Self {
            requests_per_process: 0,
            ..Default::default()
        }
    }

    /// Set the number of requests per process.
    pub fn with_requests_per_process(mut self, requests: u32) -> Self {
        self.requests_per_process = requests;
        self
    }

    /// Set the hold time.
    pub fn with_hold_time(mut self, hold_time: Duration) -> Self {
        self.hold_time = hold_time;
        self
    }

    /// Set the think time range.
    pub fn with_think_time(mut self, min: Duration, max: Duration) -> Self {
        self.think_time_min = min.min(max);
        self.think_time_max = max.max(min);
        self
    }

    /// Set the start jitter.
    pub fn with_start_jitter(mut self, jitter: Duration) -> Self {
        self.start_jitter = jitter;
        self
    }

    /// Sample the time of a process's first request.
    pub fn sample_start(&self, rng: &mut impl Rng) -> Duration {
        sample_between(Duration::ZERO, self.start_jitter, rng)
    }

    /// Sample a think time.
    pub fn sample_think_time(&self, rng: &mut impl Rng) -> Duration {
        sample_between(self.think_time_min, self.think_time_max, rng)
    }
}

fn sample_between(min: Duration, max: Duration, rng: &mut impl Rng) -> Duration {
    let (min, max) = (min.as_nanos() as u64, max.as_nanos() as u64);
    if min >= max {
        return Duration::from_nanos(min);
    }
    Duration::from_nanos(rng.gen_range(min..=max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_manual_plan_issues_nothing() {
        let plan = WorkloadPlan::manual();
        assert_eq!(plan.requests_per_process, 0);
        assert_eq!(plan.hold_time, WorkloadPlan::default().hold_time);
    }

    #[test]
    fn test_think_time_in_range() {
        let plan = WorkloadPlan::default()
            .with_think_time(Duration::from_millis(8), Duration::from_millis(2));
        assert_eq!(plan.think_time_min, Duration::from_millis(2));

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..100 {
            let think = plan.sample_think_time(&mut rng);
            assert!(think >= Duration::from_millis(2) && think <= Duration::from_millis(8));
        }
    }

    #[test]
    fn test_zero_jitter_starts_at_zero() {
        let plan = WorkloadPlan::default().with_start_jitter(Duration::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(plan.sample_start(&mut rng), Duration::ZERO);
    }
}

//! Cluster-wide invariant checks.

use crate::SimulationError;
use forklock_core::ForkMessage;
use forklock_mutex::MutexState;
use forklock_types::ProcessId;
use std::collections::BTreeMap;

/// Tracks traffic on every link and checks the global fork invariants.
///
/// A grant in flight counts as owned by its receiver: between the sender
/// marking the fork taken and the receiver marking it clean, neither local
/// view holds it.
#[derive(Debug, Default)]
pub struct ForkAudit {
    /// Requests sent per (from, to).
    requests_sent: BTreeMap<(ProcessId, ProcessId), u64>,
    /// Grants sent per (from, to).
    grants_sent: BTreeMap<(ProcessId, ProcessId), u64>,
    /// Grants sent but not yet delivered per (from, to).
    grants_in_flight: BTreeMap<(ProcessId, ProcessId), u64>,
}

impl ForkAudit {
    /// Create a new empty audit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message handed to the network.
    pub fn on_sent(&mut self, from: ProcessId, to: ProcessId, message: ForkMessage) {
        match message {
            ForkMessage::Request => *self.requests_sent.entry((from, to)).or_default() += 1,
            ForkMessage::Grant => {
                *self.grants_sent.entry((from, to)).or_default() += 1;
                *self.grants_in_flight.entry((from, to)).or_default() += 1;
            }
        }
    }

    /// Record a message delivered to its destination.
    pub fn on_delivered(&mut self, from: ProcessId, to: ProcessId, message: ForkMessage) {
        if message.is_grant() {
            if let Some(count) = self.grants_in_flight.get_mut(&(from, to)) {
                *count = count.saturating_sub(1);
            }
        }
    }

    /// Get the number of requests sent from `from` to `to`.
    pub fn requests_sent(&self, from: ProcessId, to: ProcessId) -> u64 {
        self.requests_sent.get(&(from, to)).copied().unwrap_or(0)
    }

    /// Get the number of grants sent from `from` to `to`.
    pub fn grants_sent(&self, from: ProcessId, to: ProcessId) -> u64 {
        self.grants_sent.get(&(from, to)).copied().unwrap_or(0)
    }

    /// Get the total number of requests sent.
    pub fn total_requests(&self) -> u64 {
        self.requests_sent.values().sum()
    }

    /// Get the total number of grants sent.
    pub fn total_grants(&self) -> u64 {
        self.grants_sent.values().sum()
    }

    fn grants_in_flight(&self, from: ProcessId, to: ProcessId) -> u64 {
        self.grants_in_flight.get(&(from, to)).copied().unwrap_or(0)
    }

    /// Requests from `from` to `to` that no grant has answered yet.
    ///
    /// Grants are only ever sent in answer to a request, so this never goes
    /// negative in a correct run.
    pub fn outstanding(&self, from: ProcessId, to: ProcessId) -> i64 {
        self.requests_sent(from, to) as i64 - self.grants_sent(to, from) as i64
    }

    /// Check that every fork has exactly one owner and no link has more than
    /// one outstanding request.
    pub fn check(&self, nodes: &[MutexState]) -> Result<(), SimulationError> {
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                let (a_id, b_id) = (a.local_process_id(), b.local_process_id());

                let owners = held(a, b_id)
                    + held(b, a_id)
                    + self.grants_in_flight(a_id, b_id)
                    + self.grants_in_flight(b_id, a_id);
                if owners != 1 {
                    return Err(SimulationError::ForkInvariant {
                        a: a_id,
                        b: b_id,
                        owners,
                    });
                }

                for (from, to) in [(a_id, b_id), (b_id, a_id)] {
                    let outstanding = self.outstanding(from, to);
                    if !(0..=1).contains(&outstanding) {
                        return Err(SimulationError::UnansweredRequests {
                            from,
                            to,
                            outstanding: outstanding.unsigned_abs(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Check that every request has been answered by exactly one grant.
    pub fn check_all_answered(&self) -> Result<(), SimulationError> {
        for &(from, to) in self.requests_sent.keys() {
            let outstanding = self.outstanding(from, to);
            if outstanding != 0 {
                return Err(SimulationError::UnansweredRequests {
                    from,
                    to,
                    outstanding: outstanding.unsigned_abs(),
                });
            }
        }
        for &(from, to) in self.grants_sent.keys() {
            if self.requests_sent(to, from) != self.grants_sent(from, to) {
                return Err(SimulationError::UnansweredRequests {
                    from: to,
                    to: from,
                    outstanding: self.outstanding(to, from).unsigned_abs(),
                });
            }
        }
        Ok(())
    }
}

fn held(node: &MutexState, peer: ProcessId) -> u64 {
    node.fork_state(peer).is_some_and(|s| s.is_held()) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use forklock_mutex::MutexConfig;
    use forklock_test_helpers::make_cluster_topologies;

    fn make_nodes(n: u64) -> Vec<MutexState> {
        make_cluster_topologies(n)
            .into_iter()
            .map(|t| MutexState::new(t, MutexConfig::default()))
            .collect()
    }

    #[test]
    fn test_initial_cluster_passes() {
        let nodes = make_nodes(4);
        ForkAudit::new().check(&nodes).unwrap();
    }

    #[test]
    fn test_grant_in_flight_counts_for_receiver() {
        let mut nodes = make_nodes(2);
        let mut audit = ForkAudit::new();
        let (p1, p2) = (ProcessId(1), ProcessId(2));

        nodes[1].on_lock_request().unwrap();
        audit.on_sent(p2, p1, ForkMessage::Request);
        audit.check(&nodes).unwrap();

        audit.on_delivered(p2, p1, ForkMessage::Request);
        nodes[0].on_message(p2, ForkMessage::Request).unwrap();
        audit.on_sent(p1, p2, ForkMessage::Grant);
        // Neither side holds the fork right now.
        audit.check(&nodes).unwrap();

        audit.on_delivered(p1, p2, ForkMessage::Grant);
        nodes[1].on_message(p1, ForkMessage::Grant).unwrap();
        audit.check(&nodes).unwrap();
        audit.check_all_answered().unwrap();
        assert_eq!(audit.total_requests(), 1);
        assert_eq!(audit.total_grants(), 1);
    }

    #[test]
    fn test_detects_doubly_owned_fork() {
        let nodes = make_nodes(2);
        let mut audit = ForkAudit::new();
        // A phantom grant makes the fork owned twice.
        audit.on_sent(ProcessId(2), ProcessId(1), ForkMessage::Grant);

        assert!(matches!(
            audit.check(&nodes),
            Err(SimulationError::ForkInvariant { owners: 2, .. })
        ));
    }

    #[test]
    fn test_detects_unanswered_request() {
        let mut audit = ForkAudit::new();
        audit.on_sent(ProcessId(2), ProcessId(1), ForkMessage::Request);

        assert!(matches!(
            audit.check_all_answered(),
            Err(SimulationError::UnansweredRequests { outstanding: 1, .. })
        ));
    }
}

//! Topology fixtures shared by tests.
//!
//! Clusters are numbered from 1, matching how processes are usually
//! enumerated in scenario descriptions ("process 1 asks process 2 ...").

use forklock_types::{ProcessId, StaticTopology, Topology};
use std::sync::Arc;

/// Identifiers `1..=n`.
pub fn process_ids(n: u64) -> Vec<ProcessId> {
    (1..=n).map(ProcessId).collect()
}

/// Topology of process `local` in a cluster of processes `1..=n`.
///
/// # Panics
///
/// Panics if `local` is not in `1..=n`.
pub fn make_topology(local: u64, n: u64) -> Arc<dyn Topology> {
    StaticTopology::contiguous(ProcessId(local), 1, n)
        .expect("local process must be in 1..=n")
        .into_arc()
}

/// One topology per member of a cluster of processes `1..=n`, in id order.
pub fn make_cluster_topologies(n: u64) -> Vec<Arc<dyn Topology>> {
    (1..=n).map(|local| make_topology(local, n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_topologies() {
        let topologies = make_cluster_topologies(3);
        assert_eq!(topologies.len(), 3);
        for (i, topology) in topologies.iter().enumerate() {
            assert_eq!(topology.local_process_id(), ProcessId(i as u64 + 1));
            assert_eq!(topology.processes(), process_ids(3).as_slice());
            assert_eq!(topology.peers().len(), 2);
        }
    }
}

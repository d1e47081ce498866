//! Topology trait and static implementation.

use crate::ProcessId;
use std::collections::BTreeSet;
use std::sync::Arc;

/// The fixed set of processes a local process shares forks with.
///
/// The protocol requires a complete graph: every pair of members shares
/// exactly one fork, so the peers of a process are simply all other members.
pub trait Topology: Send + Sync {
    /// Get the local process's ID.
    fn local_process_id(&self) -> ProcessId;

    /// Get every member of the cluster, local process included, in ascending order.
    fn processes(&self) -> &[ProcessId];

    // Derived methods

    /// Get the number of processes in the cluster.
    fn num_processes(&self) -> usize {
        self.processes().len()
    }

    /// Get every member except the local process, in ascending order.
    fn peers(&self) -> Vec<ProcessId> {
        let local = self.local_process_id();
        self.processes()
            .iter()
            .copied()
            .filter(|id| *id != local)
            .collect()
    }

    /// Check if a process is a member of the cluster.
    fn contains(&self, process_id: ProcessId) -> bool {
        self.processes().binary_search(&process_id).is_ok()
    }

    /// Check if a process is a member other than the local process.
    fn is_peer(&self, process_id: ProcessId) -> bool {
        process_id != self.local_process_id() && self.contains(process_id)
    }
}

/// Errors that can occur when validating topology information.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// No processes were given.
    #[error("topology has no processes")]
    Empty,

    /// The same identifier was listed more than once.
    #[error("process {0} is listed more than once")]
    DuplicateProcess(ProcessId),

    /// The local process is not in the member list.
    #[error("local process {0} is not a member of the topology")]
    LocalNotMember(ProcessId),
}

/// A static topology implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTopology {
    local_process_id: ProcessId,
    processes: Vec<ProcessId>,
}

impl StaticTopology {
    /// Create a new static topology from an explicit member list.
    ///
    /// The list may be in any order but must not contain duplicates and must
    /// include `local_process_id`.
    pub fn new(
        local_process_id: ProcessId,
        processes: impl IntoIterator<Item = ProcessId>,
    ) -> Result<Self, TopologyError> {
        let mut members = BTreeSet::new();
        for process_id in processes {
            if !members.insert(process_id) {
                return Err(TopologyError::DuplicateProcess(process_id));
            }
        }

        if members.is_empty() {
            return Err(TopologyError::Empty);
        }
        if !members.contains(&local_process_id) {
            return Err(TopologyError::LocalNotMember(local_process_id));
        }

        Ok(Self {
            local_process_id,
            processes: members.into_iter().collect(),
        })
    }

    /// Create a topology over the contiguous range `first..first + count`.
    pub fn contiguous(
        local_process_id: ProcessId,
        first: u64,
        count: u64,
    ) -> Result<Self, TopologyError> {
        Self::new(local_process_id, (first..first + count).map(ProcessId))
    }

    /// Create a topology as an Arc.
    pub fn into_arc(self) -> Arc<dyn Topology> {
        Arc::new(self)
    }
}

impl Topology for StaticTopology {
    fn local_process_id(&self) -> ProcessId {
        self.local_process_id
    }

    fn processes(&self) -> &[ProcessId] {
        &self.processes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_basics() {
        let topology = StaticTopology::contiguous(ProcessId(2), 1, 3).unwrap();

        assert_eq!(topology.local_process_id(), ProcessId(2));
        assert_eq!(topology.num_processes(), 3);
        assert_eq!(topology.peers(), vec![ProcessId(1), ProcessId(3)]);
        assert!(topology.contains(ProcessId(2)));
        assert!(!topology.is_peer(ProcessId(2)));
        assert!(topology.is_peer(ProcessId(3)));
        assert!(!topology.contains(ProcessId(4)));
    }

    #[test]
    fn test_members_are_sorted() {
        let topology =
            StaticTopology::new(ProcessId(10), [ProcessId(30), ProcessId(10), ProcessId(20)])
                .unwrap();
        assert_eq!(
            topology.processes(),
            &[ProcessId(10), ProcessId(20), ProcessId(30)]
        );
    }

    #[test]
    fn test_single_process_has_no_peers() {
        let topology = StaticTopology::new(ProcessId(0), [ProcessId(0)]).unwrap();
        assert!(topology.peers().is_empty());
    }

    #[test]
    fn test_rejects_invalid_member_lists() {
        assert_eq!(
            StaticTopology::new(ProcessId(1), Vec::<ProcessId>::new()),
            Err(TopologyError::Empty)
        );
        assert_eq!(
            StaticTopology::new(ProcessId(1), [ProcessId(1), ProcessId(2), ProcessId(1)]),
            Err(TopologyError::DuplicateProcess(ProcessId(1)))
        );
        assert_eq!(
            StaticTopology::contiguous(ProcessId(9), 1, 3),
            Err(TopologyError::LocalNotMember(ProcessId(9)))
        );
    }
}

//! Per-peer fork and deferred-request bookkeeping.

use forklock_core::ProtocolError;
use forklock_types::{ForkState, ProcessId};
use indexmap::IndexMap;

/// What the local process knows about the fork shared with one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkEntry {
    /// Local view of the fork.
    pub state: ForkState,
    /// The peer asked for the fork and is still waiting for the grant.
    pub deferred: bool,
}

/// Fork table addressed by peer identifier.
///
/// Only checks that identifiers belong to a peer. Whether a transition is
/// legal is decided by [`MutexState`](crate::MutexState). Iteration follows
/// insertion order, so repeated runs emit actions in the same order.
#[derive(Debug, Clone)]
pub struct ForkTable {
    entries: IndexMap<ProcessId, ForkEntry>,
}

impl ForkTable {
    /// Create a table with one entry per peer and no deferred requests.
    pub fn new(
        peers: impl IntoIterator<Item = ProcessId>,
        initial: impl Fn(ProcessId) -> ForkState,
    ) -> Self {
        let entries = peers
            .into_iter()
            .map(|peer| {
                (
                    peer,
                    ForkEntry {
                        state: initial(peer),
                        deferred: false,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    fn entry(&self, peer: ProcessId) -> Result<&ForkEntry, ProtocolError> {
        self.entries
            .get(&peer)
            .ok_or(ProtocolError::UnknownPeer { peer })
    }

    fn entry_mut(&mut self, peer: ProcessId) -> Result<&mut ForkEntry, ProtocolError> {
        self.entries
            .get_mut(&peer)
            .ok_or(ProtocolError::UnknownPeer { peer })
    }

    /// Get the local view of the fork shared with `peer`.
    pub fn state(&self, peer: ProcessId) -> Result<ForkState, ProtocolError> {
        self.entry(peer).map(|e| e.state)
    }

    /// Set the local view of the fork shared with `peer`.
    pub fn set_state(&mut self, peer: ProcessId, state: ForkState) -> Result<(), ProtocolError> {
        self.entry_mut(peer)?.state = state;
        Ok(())
    }

    /// Check if `peer` has a deferred request.
    pub fn is_deferred(&self, peer: ProcessId) -> Result<bool, ProtocolError> {
        self.entry(peer).map(|e| e.deferred)
    }

    /// Record a deferred request from `peer`.
    pub fn set_deferred(&mut self, peer: ProcessId) -> Result<(), ProtocolError> {
        self.entry_mut(peer)?.deferred = true;
        Ok(())
    }

    /// Clear the deferred flag for `peer`, returning whether it was set.
    pub fn take_deferred(&mut self, peer: ProcessId) -> Result<bool, ProtocolError> {
        let entry = self.entry_mut(peer)?;
        Ok(std::mem::take(&mut entry.deferred))
    }

    /// Get the entry for `peer`, if it is a peer.
    pub fn get(&self, peer: ProcessId) -> Option<ForkEntry> {
        self.entries.get(&peer).copied()
    }

    /// Iterate over all peers.
    pub fn peers(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.entries.keys().copied()
    }

    /// Get the peers currently holding their fork.
    pub fn taken_peers(&self) -> Vec<ProcessId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.state == ForkState::Taken)
            .map(|(peer, _)| *peer)
            .collect()
    }

    /// Get the number of forks held locally.
    pub fn held_count(&self) -> usize {
        self.entries.values().filter(|e| e.state.is_held()).count()
    }

    /// Get the number of deferred requests.
    pub fn deferred_count(&self) -> usize {
        self.entries.values().filter(|e| e.deferred).count()
    }

    /// Get the number of peers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no peers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

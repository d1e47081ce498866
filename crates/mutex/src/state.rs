//! Fork protocol state machine.

use crate::{ForkTable, MutexConfig};
use forklock_core::{Action, Event, ForkMessage, ProtocolError, StateMachine};
use forklock_types::{ForkState, ProcessId, Topology};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-process state of the fork protocol.
///
/// Owned by exactly one runner and mutated only through the entry points
/// below, one call at a time. Every entry point validates before it mutates,
/// so a call that returns an error leaves the state as it was.
///
/// While `wants_cs` is set, `pending_grants` equals the number of forks in
/// the `Taken` state: each of them has exactly one outstanding request.
pub struct MutexState {
    /// Network topology (single source of truth for the peer set).
    topology: Arc<dyn Topology>,

    /// Fork and deferred-request table, one entry per peer.
    forks: ForkTable,

    /// A lock request is pending.
    wants_cs: bool,

    /// Inside the critical section.
    in_cs: bool,

    /// Outstanding requests that must be granted before entry.
    pending_grants: usize,
}

impl MutexState {
    /// Create the initial state of the local process.
    ///
    /// Forks are assigned by `config.priority`; no requests are pending.
    pub fn new(topology: Arc<dyn Topology>, config: MutexConfig) -> Self {
        let local = topology.local_process_id();
        let priority = config.priority;
        let forks = ForkTable::new(topology.peers(), |peer| {
            priority.initial_state(local, peer)
        });

        debug!(
            process = %local,
            peers = forks.len(),
            held = forks.held_count(),
            ?priority,
            "Initialized fork table"
        );

        Self {
            topology,
            forks,
            wants_cs: false,
            in_cs: false,
            pending_grants: 0,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    /// Get the local process ID.
    pub fn local_process_id(&self) -> ProcessId {
        self.topology.local_process_id()
    }

    /// Check if a lock request is pending.
    pub fn wants_cs(&self) -> bool {
        self.wants_cs
    }

    /// Check if the process is inside the critical section.
    pub fn in_cs(&self) -> bool {
        self.in_cs
    }

    /// Get the number of grants still needed before entry.
    pub fn pending_grants(&self) -> usize {
        self.pending_grants
    }

    /// Get the local view of the fork shared with `peer`.
    pub fn fork_state(&self, peer: ProcessId) -> Option<ForkState> {
        self.forks.get(peer).map(|e| e.state)
    }

    /// Check if `peer` has a deferred request.
    pub fn is_deferred(&self, peer: ProcessId) -> Option<bool> {
        self.forks.get(peer).map(|e| e.deferred)
    }

    /// Get the fork table.
    pub fn forks(&self) -> &ForkTable {
        &self.forks
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Critical Section Requests
    // ═══════════════════════════════════════════════════════════════════════════

    /// Handle a local lock request.
    ///
    /// Requests every fork held by a peer. If no fork is missing the process
    /// enters the critical section before returning.
    pub fn on_lock_request(&mut self) -> Result<Vec<Action>, ProtocolError> {
        if self.wants_cs || self.in_cs {
            warn!(
                process = %self.local_process_id(),
                wants_cs = self.wants_cs,
                in_cs = self.in_cs,
                "Lock requested twice"
            );
            return Err(ProtocolError::AlreadyRequested);
        }

        self.wants_cs = true;

        let mut actions = vec![];
        for peer in self.forks.taken_peers() {
            actions.push(Action::request(peer));
            self.pending_grants += 1;
        }

        if self.pending_grants == 0 {
            actions.push(self.enter_critical_section());
        } else {
            debug!(
                process = %self.local_process_id(),
                pending_grants = self.pending_grants,
                "Requested missing forks"
            );
        }

        Ok(actions)
    }

    /// Handle a local unlock request.
    ///
    /// Grants every deferred request and marks every other fork dirty.
    pub fn on_unlock_request(&mut self) -> Result<Vec<Action>, ProtocolError> {
        if !self.in_cs {
            warn!(
                process = %self.local_process_id(),
                wants_cs = self.wants_cs,
                "Unlock requested outside the critical section"
            );
            return Err(ProtocolError::NotInCriticalSection);
        }

        self.in_cs = false;
        info!(process = %self.local_process_id(), "Left critical section");

        let mut actions = vec![Action::LeftCriticalSection];
        let peers: Vec<ProcessId> = self.forks.peers().collect();
        for peer in peers {
            if self.forks.take_deferred(peer)? {
                self.forks.set_state(peer, ForkState::Taken)?;
                actions.push(Action::grant(peer));
            } else {
                self.forks.set_state(peer, ForkState::Dirty)?;
            }
        }

        debug!(
            process = %self.local_process_id(),
            granted = actions.len() - 1,
            "Released forks"
        );

        Ok(actions)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Message Dispatch
    // ═══════════════════════════════════════════════════════════════════════════

    /// Handle a message from a peer.
    pub fn on_message(
        &mut self,
        from: ProcessId,
        message: ForkMessage,
    ) -> Result<Vec<Action>, ProtocolError> {
        match message {
            ForkMessage::Grant => self.on_grant(from),
            ForkMessage::Request => self.on_request(from),
        }
    }

    /// Handle a fork grant.
    fn on_grant(&mut self, from: ProcessId) -> Result<Vec<Action>, ProtocolError> {
        let state = self.forks.state(from)?;

        if !self.wants_cs {
            warn!(
                process = %self.local_process_id(),
                peer = %from,
                "Grant received without a pending lock request"
            );
            return Err(ProtocolError::UnsolicitedGrant { from });
        }

        if state.is_held() {
            warn!(
                process = %self.local_process_id(),
                peer = %from,
                %state,
                "Grant received for a fork already held"
            );
            return Err(ProtocolError::GrantForHeldFork { from, state });
        }

        self.forks.set_state(from, ForkState::Clean)?;
        self.pending_grants -= 1;

        debug!(
            process = %self.local_process_id(),
            peer = %from,
            pending_grants = self.pending_grants,
            "Fork granted"
        );

        if self.pending_grants == 0 {
            return Ok(vec![self.enter_critical_section()]);
        }

        Ok(vec![])
    }

    /// Handle a fork request.
    fn on_request(&mut self, from: ProcessId) -> Result<Vec<Action>, ProtocolError> {
        let state = self.forks.state(from)?;

        match state {
            ForkState::Taken => {
                warn!(
                    process = %self.local_process_id(),
                    peer = %from,
                    "Peer asked for a fork it already holds"
                );
                Err(ProtocolError::RequestForTakenFork { from })
            }

            ForkState::Clean => {
                self.check_not_deferred(from)?;

                if self.wants_cs || self.in_cs {
                    self.defer(from)?;
                    return Ok(vec![]);
                }

                self.forks.set_state(from, ForkState::Taken)?;
                debug!(process = %self.local_process_id(), peer = %from, "Granted clean fork");
                Ok(vec![Action::grant(from)])
            }

            ForkState::Dirty => {
                self.check_not_deferred(from)?;

                if self.in_cs {
                    self.defer(from)?;
                    return Ok(vec![]);
                }

                self.forks.set_state(from, ForkState::Taken)?;
                let mut actions = vec![Action::grant(from)];

                if self.wants_cs {
                    // Surrendered a fork we still need: ask for it back.
                    self.pending_grants += 1;
                    actions.push(Action::request(from));
                    debug!(
                        process = %self.local_process_id(),
                        peer = %from,
                        pending_grants = self.pending_grants,
                        "Granted dirty fork and re-requested it"
                    );
                } else {
                    debug!(process = %self.local_process_id(), peer = %from, "Granted dirty fork");
                }

                Ok(actions)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════════════════════

    fn check_not_deferred(&self, from: ProcessId) -> Result<(), ProtocolError> {
        if self.forks.is_deferred(from)? {
            warn!(
                process = %self.local_process_id(),
                peer = %from,
                "Duplicate fork request"
            );
            return Err(ProtocolError::DuplicateRequest { from });
        }
        Ok(())
    }

    fn defer(&mut self, from: ProcessId) -> Result<(), ProtocolError> {
        self.forks.set_deferred(from)?;
        debug!(
            process = %self.local_process_id(),
            peer = %from,
            in_cs = self.in_cs,
            "Deferred fork request"
        );
        Ok(())
    }

    fn enter_critical_section(&mut self) -> Action {
        self.wants_cs = false;
        self.in_cs = true;
        info!(process = %self.local_process_id(), "Entered critical section");
        Action::EnteredCriticalSection
    }
}

impl StateMachine for MutexState {
    fn handle(&mut self, event: Event) -> Result<Vec<Action>, ProtocolError> {
        match event {
            Event::LockRequested => self.on_lock_request(),
            Event::UnlockRequested => self.on_unlock_request(),
            Event::MessageReceived { from, message } => self.on_message(from, message),
        }
    }
}

impl std::fmt::Debug for MutexState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutexState")
            .field("process", &self.local_process_id())
            .field("forks", &self.forks)
            .field("wants_cs", &self.wants_cs)
            .field("in_cs", &self.in_cs)
            .field("pending_grants", &self.pending_grants)
            .finish()
    }
}

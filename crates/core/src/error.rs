//! Error types for the fork protocol.

use forklock_types::{ForkState, ProcessId};
use thiserror::Error;

/// Protocol and state-invariant violations.
///
/// None of these are recoverable. They mean the local caller misused the
/// API, a peer broke the protocol, or the transport broke its FIFO and
/// lossless guarantees. The offending entry point leaves the process state
/// untouched and returns the error to the embedding application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Lock requested while already wanting or holding the critical section.
    #[error("Lock was already requested")]
    AlreadyRequested,

    /// Unlock requested outside the critical section.
    #[error("Not in critical section")]
    NotInCriticalSection,

    /// A grant arrived although no lock request is pending.
    #[error("Unsolicited grant from {from}: no lock request is pending")]
    UnsolicitedGrant {
        /// Process that sent the grant.
        from: ProcessId,
    },

    /// A grant arrived for a fork the local view already holds.
    #[error("Grant from {from} for a fork that is already held ({state})")]
    GrantForHeldFork {
        /// Process that sent the grant.
        from: ProcessId,
        /// Local state of the fork when the grant arrived.
        state: ForkState,
    },

    /// A peer asked for a fork it already holds.
    #[error("{from} asked for a fork it already holds")]
    RequestForTakenFork {
        /// Process that sent the request.
        from: ProcessId,
    },

    /// A peer asked again before its earlier request was granted.
    #[error("{from} already has a pending request for this fork")]
    DuplicateRequest {
        /// Process that sent the request.
        from: ProcessId,
    },

    /// The identifier is not a peer of the local process.
    #[error("{peer} is not a peer of this process")]
    UnknownPeer {
        /// The offending identifier.
        peer: ProcessId,
    },
}

impl ProtocolError {
    /// Check if the error was triggered by the local application rather
    /// than by a peer's message.
    pub fn is_caller_misuse(&self) -> bool {
        matches!(
            self,
            ProtocolError::AlreadyRequested | ProtocolError::NotInCriticalSection
        )
    }
}

//! Simulation errors.

use forklock_core::ProtocolError;
use forklock_types::{ProcessId, TopologyError};
use std::time::Duration;
use thiserror::Error;

/// Reasons a simulation run stops early or fails its final checks.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A process rejected an event.
    #[error("{process} rejected an event at {time:?}: {source}")]
    Protocol {
        /// Process whose entry point failed.
        process: ProcessId,
        /// Simulated time of the failure.
        time: Duration,
        /// The protocol error.
        #[source]
        source: ProtocolError,
    },

    /// Two processes were inside the critical section at once.
    #[error("{entering} entered the critical section at {time:?} while {holder} holds it")]
    SafetyViolation {
        /// Process already inside.
        holder: ProcessId,
        /// Process that entered.
        entering: ProcessId,
        /// Simulated time of the entry.
        time: Duration,
    },

    /// A fork did not have exactly one owner.
    #[error("fork between {a} and {b} has {owners} owners, expected exactly one")]
    ForkInvariant {
        /// One side of the fork.
        a: ProcessId,
        /// The other side.
        b: ProcessId,
        /// Holders plus grants in flight.
        owners: u64,
    },

    /// Requests outnumber the grants that answered them.
    #[error("{from} has {outstanding} unanswered requests to {to}")]
    UnansweredRequests {
        /// Requesting process.
        from: ProcessId,
        /// Requested process.
        to: ProcessId,
        /// Requests without a matching grant.
        outstanding: u64,
    },

    /// A process was still busy when the event queue drained.
    #[error(
        "{process} did not settle: wants_cs={wants_cs} in_cs={in_cs} pending_grants={pending_grants}"
    )]
    NotQuiescent {
        /// The process.
        process: ProcessId,
        /// Lock request still pending.
        wants_cs: bool,
        /// Still inside the critical section.
        in_cs: bool,
        /// Grants still missing.
        pending_grants: usize,
    },

    /// The run did not drain within the configured number of events.
    #[error("event limit of {limit} exceeded")]
    EventLimitExceeded {
        /// The configured limit.
        limit: u64,
    },

    /// An event was scheduled for a process outside the cluster.
    #[error("unknown process {0}")]
    UnknownProcess(ProcessId),

    /// The process id range does not fit in `u64`.
    #[error("{count} processes starting at id {first} overflow the id space")]
    ProcessIdOverflow {
        /// Identifier of the first process.
        first: u64,
        /// Number of processes.
        count: u64,
    },

    /// The cluster topology is invalid.
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

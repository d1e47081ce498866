//! Core types for the forklock protocol.
//!
//! Everything in here is plain data: process identifiers, the three-valued
//! fork state, the initial priority assignment, and the static peer set a
//! process is created with.

mod fork;
mod identifiers;
mod topology;

pub use fork::{ForkPriority, ForkState};
pub use identifiers::ProcessId;
pub use topology::{StaticTopology, Topology, TopologyError};

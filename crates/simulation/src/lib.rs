//! Deterministic simulation runner.
//!
//! This crate runs a complete cluster of fork protocol processes in a single
//! thread. Given the same seed, it produces identical results every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Event Queue (BTreeMap<EventKey, Event>)        │ │
//! │  │     Ordered by: time, priority, node, sequence     │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     nodes: Vec<MutexState>                         │ │
//! │  │     Each processes events sequentially             │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → schedule new events                  │ │
//! │  │     ForkAudit → check invariants after each step   │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The simulated network delivers every ordered pair's messages in FIFO
//! order and never loses one, which is exactly what the protocol assumes of
//! its transport.

mod audit;
mod error;
mod event_queue;
mod network;
mod runner;
mod workload;

pub use audit::ForkAudit;
pub use error::SimulationError;
pub use event_queue::EventKey;
pub use network::{NetworkConfig, SimulatedNetwork};
pub use runner::{CriticalSectionRecord, SimulationConfig, SimulationRunner, SimulationStats};
pub use workload::WorkloadPlan;

/// Type alias for deterministic node indexing in simulation.
///
/// This is a simulation-only concept for routing between in-process nodes.
/// The protocol itself only knows `ProcessId`.
pub type NodeIndex = u32;

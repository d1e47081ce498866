//! Fork state and the initial priority assignment.

use crate::ProcessId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Local view of the fork shared with one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForkState {
    /// Held, and not used since it was received.
    Clean,

    /// Held, and used by a completed critical section since it was received.
    ///
    /// A dirty fork is surrendered on any request unless the local process is
    /// inside the critical section right now.
    Dirty,

    /// The peer holds the fork.
    Taken,
}

impl ForkState {
    /// Check if the local process holds the fork (clean or dirty).
    pub fn is_held(&self) -> bool {
        !matches!(self, ForkState::Taken)
    }
}

impl fmt::Display for ForkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForkState::Clean => write!(f, "clean"),
            ForkState::Dirty => write!(f, "dirty"),
            ForkState::Taken => write!(f, "taken"),
        }
    }
}

/// Which side of each pair starts out holding the shared fork.
///
/// Both variants orient every edge of the complete graph along the total
/// order of [`ProcessId`], so the resulting precedence graph is acyclic and
/// the protocol cannot deadlock. Every process in a cluster must be configured
/// with the same variant, otherwise the two views of a fork disagree from the
/// start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForkPriority {
    /// The smaller identifier starts with the fork, dirty.
    #[default]
    LowerIdHolds,

    /// The larger identifier starts with the fork, dirty.
    HigherIdHolds,
}

impl ForkPriority {
    /// Initial local state of the fork between `local` and `peer`.
    ///
    /// Held forks start dirty so the holder surrenders them on the first
    /// request instead of hoarding them.
    pub fn initial_state(&self, local: ProcessId, peer: ProcessId) -> ForkState {
        let holds = match self {
            ForkPriority::LowerIdHolds => local < peer,
            ForkPriority::HigherIdHolds => local > peer,
        };
        if holds {
            ForkState::Dirty
        } else {
            ForkState::Taken
        }
    }
}

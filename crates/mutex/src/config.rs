//! Mutex configuration.

use forklock_types::ForkPriority;
use serde::{Deserialize, Serialize};

/// Configuration for the fork protocol.
///
/// All processes of a cluster must share the same configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutexConfig {
    /// Which side of each pair starts out holding the shared fork.
    #[serde(default)]
    pub priority: ForkPriority,
}

impl MutexConfig {
    /// Set the initial fork assignment.
    pub fn with_priority(mut self, priority: ForkPriority) -> Self {
        self.priority = priority;
        self
    }
}

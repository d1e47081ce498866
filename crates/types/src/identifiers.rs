//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process identifier.
///
/// Identifiers are distinct within a cluster and totally ordered. The order is
/// what the initial fork assignment is derived from, see [`ForkPriority`].
///
/// [`ForkPriority`]: crate::ForkPriority
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProcessId(pub u64);

impl ProcessId {
    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ProcessId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process({})", self.0)
    }
}

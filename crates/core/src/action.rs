//! Outputs of the state machine.

use crate::ForkMessage;
use forklock_types::ProcessId;

/// Actions for the runner to perform, in order.
///
/// The runner handles all I/O: delivering messages to peers and notifying
/// the local application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send a message to one peer. Fire-and-forget.
    SendMessage {
        /// Destination process.
        to: ProcessId,
        /// The message.
        message: ForkMessage,
    },

    /// The local process now holds the critical section.
    EnteredCriticalSection,

    /// The local process has given up the critical section.
    LeftCriticalSection,
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::SendMessage { message, .. } => match message {
                ForkMessage::Request => "SendRequest",
                ForkMessage::Grant => "SendGrant",
            },
            Action::EnteredCriticalSection => "EnteredCriticalSection",
            Action::LeftCriticalSection => "LeftCriticalSection",
        }
    }

    /// Shorthand for a request to `to`.
    pub fn request(to: ProcessId) -> Self {
        Action::SendMessage {
            to,
            message: ForkMessage::Request,
        }
    }

    /// Shorthand for a grant to `to`.
    pub fn grant(to: ProcessId) -> Self {
        Action::SendMessage {
            to,
            message: ForkMessage::Grant,
        }
    }
}

//! Inputs to the state machine.

use crate::ForkMessage;
use forklock_types::ProcessId;

/// Events delivered to a process by its runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The local application wants to enter the critical section.
    LockRequested,

    /// The local application is done with the critical section.
    UnlockRequested,

    /// A peer's message arrived.
    MessageReceived {
        /// Sending process.
        from: ProcessId,
        /// The message.
        message: ForkMessage,
    },
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::LockRequested => "LockRequested",
            Event::UnlockRequested => "UnlockRequested",
            Event::MessageReceived { message, .. } => match message {
                ForkMessage::Request => "RequestReceived",
                ForkMessage::Grant => "GrantReceived",
            },
        }
    }
}

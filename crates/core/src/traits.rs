//! Core traits for state machines.

use crate::{Action, Event, ProtocolError};

/// A state machine that processes events.
///
/// The fork protocol is implemented as a state machine that is:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + event = same actions
/// - **Pure-ish**: Mutates self, but performs no I/O
///
/// # Example
///
/// ```ignore
/// impl StateMachine for MutexState {
///     fn handle(&mut self, event: Event) -> Result<Vec<Action>, ProtocolError> {
///         match event {
///             Event::LockRequested => self.on_lock_request(),
///             Event::UnlockRequested => self.on_unlock_request(),
///             Event::MessageReceived { from, message } => self.on_message(from, message),
///         }
///     }
/// }
/// ```
pub trait StateMachine {
    /// Process an event, returning actions to perform.
    ///
    /// # Guarantees
    ///
    /// - **Synchronous**: This method never blocks or awaits
    /// - **Deterministic**: Given the same state and event, always returns the same actions
    /// - **No I/O**: All I/O is performed by the runner via the returned actions
    /// - **Atomic**: On error, the state is left as it was before the call
    ///
    /// # Arguments
    ///
    /// * `event` - The event to process
    ///
    /// # Returns
    ///
    /// A list of actions for the runner to execute in order, or the protocol
    /// violation that aborted the event.
    fn handle(&mut self, event: Event) -> Result<Vec<Action>, ProtocolError>;
}

//! Core types for the forklock protocol: `Event`, `Action`, and the
//! `StateMachine` trait.
//!
//! A process is driven entirely from outside. The runner feeds it
//! [`Event`]s and performs the [`Action`]s it returns; the state machine
//! itself never sends, sleeps, or blocks.

mod action;
mod error;
mod event;
mod message;
mod traits;

pub use action::Action;
pub use error::ProtocolError;
pub use event::Event;
pub use message::ForkMessage;
pub use traits::StateMachine;

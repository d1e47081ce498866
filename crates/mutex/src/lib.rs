//! Fork-based distributed mutual exclusion state machine.
//!
//! Every pair of processes shares one fork. A process may enter the critical
//! section once it holds all of its forks. This is the Chandy–Misra
//! hygienic scheme applied to a complete graph:
//!
//! - `Event::LockRequested` → Request every fork we do not hold, or enter at once
//! - `Event::MessageReceived { Grant }` → Take the fork clean, enter when none are missing
//! - `Event::MessageReceived { Request }` → Surrender a dirty fork unless inside the
//!   critical section (re-requesting it if we still want in), keep a clean
//!   one while we want or hold the section, otherwise hand it over
//! - `Event::UnlockRequested` → Leave, grant every deferred request, dirty the rest
//!
//! Forks start dirty on the side chosen by [`ForkPriority`], which orients
//! the precedence graph acyclically and rules out deadlock.
//!
//! All I/O is performed by the runner via returned `Action`s.
//!
//! [`ForkPriority`]: forklock_types::ForkPriority

mod config;
mod forks;
mod state;

pub use config::MutexConfig;
pub use forks::{ForkEntry, ForkTable};
pub use state::MutexState;

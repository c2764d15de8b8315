//! Session management module.
//!
//! This module holds the per-session shell state (variables, activity start
//! time, exit flag) and the termination state machine shared with the
//! termination coordinator.

mod context;
mod state;

pub use context::SessionContext;
pub use state::TerminationState;

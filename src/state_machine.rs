//! Turn lifecycle state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! the controller feeds events in and applies the effects that come out.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::TurnState;
pub use transition::{transition, TransitionError};

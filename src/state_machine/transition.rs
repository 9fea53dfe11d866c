//! Pure state transition function

use super::{Effect, Event, TurnState};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyInput,
    #[error("A reply is still being generated, wait for it before sending another message")]
    TurnAlreadyInFlight,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs and performs no
/// I/O. A rejected event leaves the state untouched and yields no effects.
pub fn transition(state: &TurnState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User Message Handling
        // ============================================================

        // Blank input is rejected in any state, before the busy check
        (_, Event::UserMessage { text, .. }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyInput)
        }

        // Idle + UserMessage -> AwaitingReply
        (TurnState::Idle, Event::UserMessage { turn_id, text }) => Ok(TransitionResult::new(
            TurnState::AwaitingReply {
                turn_id: turn_id.clone(),
            },
        )
        .with_effect(Effect::append_user_message(text.clone()))
        .with_effect(Effect::request_reply(turn_id, text))),

        // Busy + UserMessage -> Reject
        (TurnState::AwaitingReply { .. }, Event::UserMessage { .. }) => {
            Err(TransitionError::TurnAlreadyInFlight)
        }

        // ============================================================
        // Gateway Completion
        // ============================================================

        // AwaitingReply + ReplyReceived (same turn) -> Idle
        (TurnState::AwaitingReply { turn_id }, Event::ReplyReceived { turn_id: reply_turn, text })
            if *turn_id == reply_turn =>
        {
            Ok(TransitionResult::new(TurnState::Idle)
                .with_effect(Effect::append_assistant_message(text)))
        }

        // AwaitingReply + ReplyFailed (same turn) -> Idle, nothing appended
        (
            TurnState::AwaitingReply { turn_id },
            Event::ReplyFailed {
                turn_id: failed_turn,
                error_kind,
                message,
            },
        ) if *turn_id == failed_turn => {
            Ok(TransitionResult::new(TurnState::Idle).with_effect(Effect::ReportFailure {
                error_kind,
                message,
            }))
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}

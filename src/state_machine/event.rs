//! Events that can occur during a turn

use crate::gateway::GatewayErrorKind;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage {
        /// Generated by the caller; the transition function never mints ids
        turn_id: String,
        text: String,
    },

    // Gateway events
    ReplyReceived {
        turn_id: String,
        text: String,
    },
    ReplyFailed {
        turn_id: String,
        error_kind: GatewayErrorKind,
        message: String,
    },
}

impl Event {
    pub fn user_message(turn_id: impl Into<String>, text: impl Into<String>) -> Self {
        Event::UserMessage {
            turn_id: turn_id.into(),
            text: text.into(),
        }
    }

    pub fn reply_received(turn_id: impl Into<String>, text: impl Into<String>) -> Self {
        Event::ReplyReceived {
            turn_id: turn_id.into(),
            text: text.into(),
        }
    }

    pub fn reply_failed(
        turn_id: impl Into<String>,
        error_kind: GatewayErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Event::ReplyFailed {
            turn_id: turn_id.into(),
            error_kind,
            message: message.into(),
        }
    }
}

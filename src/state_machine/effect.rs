//! Effects produced by state transitions

use crate::gateway::GatewayErrorKind;
use crate::session::Role;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a message to the transcript (applied under the session lock)
    AppendMessage { role: Role, content: String },

    /// Ask the assistant gateway for the reply to this turn
    RequestReply { turn_id: String, text: String },

    /// Surface a failed turn to connected clients
    ReportFailure {
        error_kind: GatewayErrorKind,
        message: String,
    },
}

impl Effect {
    pub fn append_user_message(content: impl Into<String>) -> Self {
        Effect::AppendMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn append_assistant_message(content: impl Into<String>) -> Self {
        Effect::AppendMessage {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn request_reply(turn_id: impl Into<String>, text: impl Into<String>) -> Self {
        Effect::RequestReply {
            turn_id: turn_id.into(),
            text: text.into(),
        }
    }
}

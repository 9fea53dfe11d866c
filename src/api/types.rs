//! API request and response types

use crate::advisor::Advisor;
use crate::session::Message;
use serde::{Deserialize, Serialize};

/// Input placeholder shown while the session is idle
pub const INPUT_PLACEHOLDER: &str = "Please ask me your question…";

/// Text shown while a reply is pending
pub const PENDING_REPLY_TEXT: &str = "Working on this for you now...";

/// Request to create a new session
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    pub advisor: Option<String>,
}

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    /// Switch the session to this advisor for this and later turns
    #[serde(default)]
    pub advisor: Option<String>,
}

/// Response for a completed turn
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: Message,
}

/// Copy the client renders around the chat input
#[derive(Debug, Serialize)]
pub struct UiCopy {
    pub input_placeholder: &'static str,
    pub pending_reply: &'static str,
}

impl Default for UiCopy {
    fn default() -> Self {
        Self {
            input_placeholder: INPUT_PLACEHOLDER,
            pending_reply: PENDING_REPLY_TEXT,
        }
    }
}

/// Response for advisor list
#[derive(Debug, Serialize)]
pub struct AdvisorsResponse {
    pub advisors: Vec<Advisor>,
    pub default: Option<String>,
    pub ui: UiCopy,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

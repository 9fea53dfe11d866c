//! Assistant gateway abstraction
//!
//! The turn controller only ever talks to a hosted assistant through
//! [`AssistantGateway`]. The production implementation targets the `OpenAI`
//! Assistants API, where a conversation is a thread and a reply is produced
//! by an asynchronous run that has to be polled.

mod error;
mod openai;
mod poll;

pub use error::{GatewayError, GatewayErrorKind};
pub use openai::OpenAiAssistantsGateway;
pub use poll::PollPolicy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque handle grouping all turns of one session on the assistant side
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Common interface for hosted assistant backends
#[async_trait]
pub trait AssistantGateway: Send + Sync {
    /// Create a new conversation context
    async fn create_conversation(&self) -> Result<ConversationId, GatewayError>;

    /// Post `text` to the conversation and wait for the assistant's single reply
    ///
    /// Blocks until the backend reaches a terminal state or the gateway's own
    /// bounded wait elapses. Never returns partial output.
    async fn ask(
        &self,
        conversation: &ConversationId,
        assistant_id: &str,
        text: &str,
    ) -> Result<String, GatewayError>;
}

#[async_trait]
impl<T: AssistantGateway + ?Sized> AssistantGateway for Arc<T> {
    async fn create_conversation(&self) -> Result<ConversationId, GatewayError> {
        (**self).create_conversation().await
    }

    async fn ask(
        &self,
        conversation: &ConversationId,
        assistant_id: &str,
        text: &str,
    ) -> Result<String, GatewayError> {
        (**self).ask(conversation, assistant_id, text).await
    }
}

/// Logging wrapper for assistant gateways
pub struct LoggingGateway<G> {
    inner: G,
}

impl<G: AssistantGateway> LoggingGateway<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<G: AssistantGateway> AssistantGateway for LoggingGateway<G> {
    async fn create_conversation(&self) -> Result<ConversationId, GatewayError> {
        let start = std::time::Instant::now();
        let result = self.inner.create_conversation().await;
        let duration = start.elapsed();

        match &result {
            Ok(id) => {
                tracing::info!(
                    conversation_id = %id,
                    duration_ms = %duration.as_millis(),
                    "Conversation created"
                );
            }
            Err(e) => {
                tracing::error!(
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Conversation creation failed"
                );
            }
        }

        result
    }

    async fn ask(
        &self,
        conversation: &ConversationId,
        assistant_id: &str,
        text: &str,
    ) -> Result<String, GatewayError> {
        let start = std::time::Instant::now();
        let result = self.inner.ask(conversation, assistant_id, text).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    conversation_id = %conversation,
                    assistant_id = %assistant_id,
                    duration_ms = %duration.as_millis(),
                    reply_chars = reply.chars().count(),
                    "Assistant reply received"
                );
            }
            Err(e) => {
                tracing::error!(
                    conversation_id = %conversation,
                    assistant_id = %assistant_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Assistant request failed"
                );
            }
        }

        result
    }
}

//! Turn controller
//!
//! Drives one turn from submission to reply: the session applies the state
//! machine's transcript effects, and the controller performs the single
//! `RequestReply` effect by bootstrapping the conversation and calling the
//! gateway.

#[cfg(test)]
pub mod testing;

use crate::advisor::{Advisor, AdvisorRegistry};
use crate::gateway::{AssistantGateway, ConversationId, GatewayError};
use crate::session::{ConversationSession, Message};
use crate::state_machine::{Effect, Event, TransitionError};
use std::sync::Arc;
use thiserror::Error;

/// Why a submission did not produce a reply
#[derive(Debug, Clone, Error)]
pub enum TurnError {
    #[error("Message is empty")]
    EmptyInput,
    #[error("A reply is still being generated, wait for it before sending another message")]
    TurnAlreadyInFlight,
    #[error("Unknown advisor: {0}")]
    UnknownAdvisor(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("{0}")]
    Internal(String),
}

impl From<TransitionError> for TurnError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::EmptyInput => TurnError::EmptyInput,
            TransitionError::TurnAlreadyInFlight => TurnError::TurnAlreadyInFlight,
            TransitionError::InvalidTransition(msg) => TurnError::Internal(msg),
        }
    }
}

pub struct TurnController<G: ?Sized> {
    gateway: Arc<G>,
    advisors: Arc<AdvisorRegistry>,
}

impl<G: AssistantGateway + ?Sized + 'static> TurnController<G> {
    pub fn new(gateway: Arc<G>, advisors: Arc<AdvisorRegistry>) -> Self {
        Self { gateway, advisors }
    }

    pub fn advisors(&self) -> &AdvisorRegistry {
        &self.advisors
    }

    /// Submit one user message and wait for the assistant's reply
    ///
    /// Blank text, a turn already in flight or an unknown advisor are
    /// rejected without touching the session. Once accepted, the gateway call
    /// runs on its own task: dropping the returned future does not abandon
    /// the turn, and the session always returns to idle.
    pub async fn submit(
        &self,
        session: &Arc<ConversationSession>,
        text: &str,
        advisor: Option<&str>,
    ) -> Result<Message, TurnError> {
        let advisor = advisor
            .map(|id| {
                self.advisors
                    .get(id)
                    .ok_or_else(|| TurnError::UnknownAdvisor(id.to_string()))
            })
            .transpose()?;

        let turn_id = uuid::Uuid::new_v4().to_string();
        let applied = session.apply_with_advisor(Event::user_message(&turn_id, text), advisor)?;

        let Some((turn_id, text)) = applied.pending.into_iter().find_map(|effect| match effect {
            Effect::RequestReply { turn_id, text } => Some((turn_id, text)),
            _ => None,
        }) else {
            return Err(TurnError::Internal("Accepted message requested no reply".to_string()));
        };

        tracing::info!(session_id = %session.id(), turn_id = %turn_id, "Turn started");
        self.run_turn(session, turn_id, text).await
    }

    async fn run_turn(
        &self,
        session: &Arc<ConversationSession>,
        turn_id: String,
        text: String,
    ) -> Result<Message, TurnError> {
        let gateway = Arc::clone(&self.gateway);
        let task_session = Arc::clone(session);
        let task_turn_id = turn_id.clone();
        let task = tokio::spawn(async move {
            complete_turn(gateway.as_ref(), &task_session, task_turn_id, text).await
        });

        match task.await {
            Ok(result) => result,
            Err(join_error) => {
                // The task died before settling the turn
                let error = GatewayError::failed(format!("Turn task failed: {join_error}"));
                tracing::error!(session_id = %session.id(), turn_id = %turn_id, error = %error, "Turn aborted");
                session.apply(Event::reply_failed(&turn_id, error.kind, &error.message))?;
                Err(TurnError::Gateway(error))
            }
        }
    }
}

/// Make sure the session has a conversation id, creating one on first use
///
/// Idempotent, including under concurrent callers: only one create call is
/// in flight at a time and a failure stores nothing.
pub async fn ensure_conversation<G: AssistantGateway + ?Sized>(
    gateway: &G,
    session: &ConversationSession,
) -> Result<ConversationId, GatewayError> {
    session
        .conversation_cell()
        .get_or_try_init(|| async {
            let id = gateway.create_conversation().await?;
            tracing::info!(session_id = %session.id(), conversation_id = %id, "Conversation bootstrapped");
            Ok::<_, GatewayError>(id)
        })
        .await
        .cloned()
}

async fn complete_turn<G: AssistantGateway + ?Sized>(
    gateway: &G,
    session: &ConversationSession,
    turn_id: String,
    text: String,
) -> Result<Message, TurnError> {
    let advisor: Arc<Advisor> = session.advisor();
    let reply = match ensure_conversation(gateway, session).await {
        Ok(conversation) => gateway.ask(&conversation, &advisor.assistant_id, &text).await,
        Err(e) => Err(e),
    };

    match reply {
        Ok(reply) => {
            let applied = session.apply(Event::reply_received(&turn_id, reply))?;
            tracing::info!(session_id = %session.id(), turn_id = %turn_id, "Turn completed");
            applied
                .appended
                .into_iter()
                .next()
                .ok_or_else(|| TurnError::Internal("Reply was not recorded".to_string()))
        }
        Err(e) => {
            tracing::warn!(
                session_id = %session.id(),
                turn_id = %turn_id,
                kind = ?e.kind,
                error = %e.message,
                "Turn failed"
            );
            session.apply(Event::reply_failed(&turn_id, e.kind, &e.message))?;
            Err(TurnError::Gateway(e))
        }
    }
}

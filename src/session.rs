//! Conversation sessions
//!
//! A [`ConversationSession`] is the explicit per-user store for one chat:
//! the transcript, the turn state and the lazily created conversation id.
//! Every mutation goes through [`ConversationSession::apply`], which runs the
//! pure transition and applies its transcript effects under one lock, so the
//! busy flag and the transcript can never be observed out of step.

use crate::advisor::Advisor;
use crate::gateway::{ConversationId, GatewayErrorKind};
use crate::state_machine::{transition, Effect, Event, TransitionError, TurnState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, OnceCell, RwLock};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One immutable transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Changes published to whoever renders the session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Message { message: Message },
    StateChange { busy: bool },
    Error {
        kind: GatewayErrorKind,
        message: String,
    },
}

/// Point-in-time view of a session for rendering
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub advisor: String,
    pub conversation_id: Option<ConversationId>,
    pub busy: bool,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

struct SessionInner {
    state: TurnState,
    transcript: Vec<Message>,
    advisor: Arc<Advisor>,
    last_active: Instant,
}

/// Outcome of an accepted event
#[derive(Debug)]
pub struct Applied {
    /// Messages appended to the transcript, in order
    pub appended: Vec<Message>,
    /// Effects the session cannot perform itself
    pub pending: Vec<Effect>,
}

/// State for one interactive session
pub struct ConversationSession {
    id: String,
    created_at: DateTime<Utc>,
    conversation: OnceCell<ConversationId>,
    inner: Mutex<SessionInner>,
    events: broadcast::Sender<SessionEvent>,
}

impl ConversationSession {
    pub fn new(advisor: Arc<Advisor>) -> Self {
        let (events, _) = broadcast::channel(128);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            conversation: OnceCell::new(),
            inner: Mutex::new(SessionInner {
                state: TurnState::Idle,
                transcript: Vec::new(),
                advisor,
                last_active: Instant::now(),
            }),
            events,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The conversation id, if it has been bootstrapped
    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation.get()
    }

    pub(crate) fn conversation_cell(&self) -> &OnceCell<ConversationId> {
        &self.conversation
    }

    pub fn is_busy(&self) -> bool {
        self.lock().state.is_busy()
    }

    pub fn state(&self) -> TurnState {
        self.lock().state.clone()
    }

    pub fn advisor(&self) -> Arc<Advisor> {
        Arc::clone(&self.lock().advisor)
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.lock().transcript.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        self.snapshot_locked(&inner)
    }

    /// Snapshot plus a receiver for every change after it
    ///
    /// Both are taken under the session lock, so no event is missed or
    /// duplicated between the two.
    pub fn subscribe(&self) -> (SessionSnapshot, broadcast::Receiver<SessionEvent>) {
        let inner = self.lock();
        let rx = self.events.subscribe();
        (self.snapshot_locked(&inner), rx)
    }

    /// Time since the last accepted change
    pub fn idle_for(&self) -> Duration {
        self.lock().last_active.elapsed()
    }

    /// Run one event through the state machine and apply its session effects
    ///
    /// Transcript appends and failure reports are applied here; any
    /// remaining effects (the reply request) are returned to the caller.
    /// A rejected event changes nothing.
    pub fn apply(&self, event: Event) -> Result<Applied, TransitionError> {
        self.apply_with_advisor(event, None)
    }

    /// Like [`Self::apply`], switching the session's advisor when the event
    /// is accepted
    pub fn apply_with_advisor(
        &self,
        event: Event,
        advisor: Option<Arc<Advisor>>,
    ) -> Result<Applied, TransitionError> {
        let mut inner = self.lock();
        let result = transition(&inner.state, event)?;

        let was_busy = inner.state.is_busy();
        inner.state = result.new_state;
        inner.last_active = Instant::now();
        if let Some(advisor) = advisor {
            inner.advisor = advisor;
        }

        let mut appended = Vec::new();
        let mut pending = Vec::new();
        for effect in result.effects {
            match effect {
                Effect::AppendMessage { role, content } => {
                    let message = Message::new(role, content);
                    inner.transcript.push(message.clone());
                    appended.push(message.clone());
                    self.publish(SessionEvent::Message { message });
                }
                Effect::ReportFailure {
                    error_kind,
                    message,
                } => {
                    self.publish(SessionEvent::Error {
                        kind: error_kind,
                        message,
                    });
                }
                effect @ Effect::RequestReply { .. } => pending.push(effect),
            }
        }

        let busy = inner.state.is_busy();
        if busy != was_busy {
            self.publish(SessionEvent::StateChange { busy });
        }

        Ok(Applied { appended, pending })
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn snapshot_locked(&self, inner: &SessionInner) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            advisor: inner.advisor.id.clone(),
            conversation_id: self.conversation_id().cloned(),
            busy: inner.state.is_busy(),
            messages: inner.transcript.clone(),
            created_at: self.created_at,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owner of all live sessions
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<ConversationSession>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self, advisor: Arc<Advisor>) -> Arc<ConversationSession> {
        let session = Arc::new(ConversationSession::new(advisor));
        self.sessions
            .write()
            .await
            .insert(session.id().to_string(), Arc::clone(&session));
        let live_sessions = self.len().await;
        tracing::info!(
            session_id = %session.id(),
            advisor = %session.advisor().id,
            live_sessions,
            "Session created"
        );
        session
    }

    pub async fn get(&self, id: &str) -> Option<Arc<ConversationSession>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Tear a session down
    ///
    /// An in-flight turn keeps its own handle and still completes.
    pub async fn remove(&self, id: &str) -> Option<Arc<ConversationSession>> {
        let removed = self.sessions.write().await.remove(id);
        if let Some(session) = &removed {
            let state = session.state();
            tracing::info!(
                session_id = %id,
                in_flight_turn = ?state.turn_id(),
                messages = session.transcript().len(),
                "Session closed"
            );
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Remove sessions idle for at least `ttl`; busy sessions are kept
    pub async fn reap_idle(&self, ttl: Duration) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| !s.is_busy() && s.idle_for() >= ttl)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            sessions.remove(id);
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Expired idle sessions");
        }
        expired
    }

    /// Periodically reap idle sessions for the lifetime of the process
    pub fn spawn_reaper(self: &Arc<Self>, ttl: Duration) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = (ttl / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                manager.reap_idle(ttl).await;
            }
        })
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

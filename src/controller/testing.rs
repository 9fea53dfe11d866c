//! Mock gateway and fixtures for turn tests

use crate::advisor::{Advisor, AdvisorConfig, AdvisorRegistry};
use crate::gateway::{AssistantGateway, ConversationId, GatewayError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// One recorded `ask` call
#[derive(Debug, Clone)]
pub struct AskRecord {
    pub conversation: ConversationId,
    pub assistant_id: String,
    pub text: String,
}

/// Gateway that returns queued replies
///
/// Conversations are created as `thread_1`, `thread_2`, ... unless an error
/// is queued for creation.
pub struct MockGateway {
    replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    create_errors: Mutex<VecDeque<GatewayError>>,
    creates: AtomicUsize,
    asks: Mutex<Vec<AskRecord>>,
    delay: Duration,
    panic_on_ask: bool,
    /// Signalled each time `ask` is entered
    pub ask_started: Notify,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            create_errors: Mutex::new(VecDeque::new()),
            creates: AtomicUsize::new(0),
            asks: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            panic_on_ask: false,
            ask_started: Notify::new(),
        }
    }

    /// Delay every call, to observe the session mid-turn
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_ask = true;
        self
    }

    pub fn queue_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn queue_error(&self, error: GatewayError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_create_error(&self, error: GatewayError) {
        self.create_errors.lock().unwrap().push_back(error);
    }

    /// Number of `create_conversation` calls, failed ones included
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn recorded_asks(&self) -> Vec<AskRecord> {
        self.asks.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssistantGateway for MockGateway {
    async fn create_conversation(&self) -> Result<ConversationId, GatewayError> {
        let n = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        self.pause().await;
        if let Some(error) = self.create_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(ConversationId::new(format!("thread_{n}")))
    }

    async fn ask(
        &self,
        conversation: &ConversationId,
        assistant_id: &str,
        text: &str,
    ) -> Result<String, GatewayError> {
        self.asks.lock().unwrap().push(AskRecord {
            conversation: conversation.clone(),
            assistant_id: assistant_id.to_string(),
            text: text.to_string(),
        });
        self.ask_started.notify_one();
        assert!(!self.panic_on_ask, "mock gateway panicked");
        self.pause().await;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::failed("No mock reply queued")))
    }
}

/// Registry with both built-in advisors enabled as `asst_ny` / `asst_md`
pub fn registry() -> AdvisorRegistry {
    let mut config = AdvisorConfig::default();
    config.assistant_ids.insert("ny".to_string(), "asst_ny".to_string());
    config.assistant_ids.insert("md".to_string(), "asst_md".to_string());
    AdvisorRegistry::new(&config)
}

/// A built-in advisor bound to `asst_{id}`
pub fn test_advisor(id: &str) -> Arc<Advisor> {
    registry()
        .get(id)
        .unwrap_or_else(|| panic!("no built-in advisor {id}"))
}

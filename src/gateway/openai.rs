//! `OpenAI` Assistants (v2) gateway implementation

use super::{AssistantGateway, ConversationId, GatewayError, PollPolicy};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Per-request timeout; the run itself is bounded by [`PollPolicy::max_wait`]
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on the best-effort cancel issued after a timed-out run
const CANCEL_TIMEOUT: Duration = Duration::from_secs(5);

/// Gateway backed by `OpenAI` threads and runs
pub struct OpenAiAssistantsGateway {
    client: Client,
    api_key: String,
    base_url: String,
    poll: PollPolicy,
}

impl OpenAiAssistantsGateway {
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<&str>,
        poll: PollPolicy,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::failed(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            poll,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send a request with the Assistants headers and decode the JSON body
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let response = request
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await
            .map_err(|e| GatewayError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::unavailable(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(error_resp) => error_resp.error.message,
                Err(_) => body,
            };
            return Err(GatewayError::from_status(status.as_u16(), &message));
        }

        serde_json::from_str(&body).map_err(|e| {
            GatewayError::failed(format!("Failed to parse response: {e} - body: {body}"))
        })
    }

    async fn add_user_message(&self, thread_id: &str, text: &str) -> Result<(), GatewayError> {
        let _: ObjectRef = self
            .send(
                self.client
                    .post(self.url(&format!("threads/{thread_id}/messages")))
                    .json(&json!({ "role": "user", "content": text })),
            )
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, GatewayError> {
        self.send(
            self.client
                .post(self.url(&format!("threads/{thread_id}/runs")))
                .json(&json!({ "assistant_id": assistant_id })),
        )
        .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, GatewayError> {
        self.send(
            self.client
                .get(self.url(&format!("threads/{thread_id}/runs/{run_id}"))),
        )
        .await
    }

    /// Cancel a run, logging rather than returning any failure
    ///
    /// A thread rejects new messages while a run is active on it.
    async fn cancel_run(&self, thread_id: &str, run_id: &str) {
        let cancel = self.send::<Run>(
            self.client
                .post(self.url(&format!("threads/{thread_id}/runs/{run_id}/cancel"))),
        );

        match tokio::time::timeout(CANCEL_TIMEOUT, cancel).await {
            Ok(Ok(run)) => {
                tracing::info!(run_id, status = ?run.status, "Cancelled run after timeout");
            }
            Ok(Err(e)) => {
                tracing::warn!(run_id, error = %e.message, "Failed to cancel timed-out run");
            }
            Err(_) => tracing::warn!(run_id, "Cancel request for timed-out run did not finish"),
        }
    }

    /// Poll the run with bounded backoff until it reaches a terminal state
    ///
    /// Every poll request is bounded by the remaining wait. A run still
    /// active at the deadline is cancelled before reporting the timeout.
    async fn wait_for_run(&self, thread_id: &str, run: Run) -> Result<(), GatewayError> {
        let deadline = Instant::now() + self.poll.max_wait;
        let mut current = run;
        let mut attempt = 0;

        loop {
            match current.status {
                RunStatus::Completed => return Ok(()),
                RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling => {}
                status => return Err(run_failure(status, current.last_error.as_ref())),
            }

            let now = Instant::now();
            if now >= deadline {
                self.cancel_run(thread_id, &current.id).await;
                return Err(GatewayError::timeout(format!(
                    "Run {} did not complete within {}s",
                    current.id,
                    self.poll.max_wait.as_secs()
                )));
            }
            tokio::time::sleep(self.poll.delay(attempt).min(deadline - now)).await;
            attempt += 1;

            let remaining = deadline.saturating_duration_since(Instant::now());
            let Ok(polled) =
                tokio::time::timeout(remaining, self.retrieve_run(thread_id, &current.id)).await
            else {
                // Deadline hit mid-request; the next pass reports the timeout
                continue;
            };

            match polled {
                Ok(run) => current = run,
                Err(e) if e.kind.is_transient() => {
                    tracing::warn!(
                        run_id = %current.id,
                        attempt,
                        error = %e.message,
                        "Transient error while polling run"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn latest_reply(&self, thread_id: &str, run_id: &str) -> Result<String, GatewayError> {
        let list: MessageList = self
            .send(
                self.client
                    .get(self.url(&format!("threads/{thread_id}/messages")))
                    .query(&[("order", "desc"), ("limit", "10"), ("run_id", run_id)]),
            )
            .await?;

        extract_reply(list)
    }
}

#[async_trait]
impl AssistantGateway for OpenAiAssistantsGateway {
    async fn create_conversation(&self) -> Result<ConversationId, GatewayError> {
        let thread: ObjectRef = self
            .send(self.client.post(self.url("threads")).json(&json!({})))
            .await?;
        Ok(ConversationId::new(thread.id))
    }

    async fn ask(
        &self,
        conversation: &ConversationId,
        assistant_id: &str,
        text: &str,
    ) -> Result<String, GatewayError> {
        let thread_id = conversation.as_str();
        self.add_user_message(thread_id, text).await?;
        let run = self.create_run(thread_id, assistant_id).await?;
        let run_id = run.id.clone();

        tracing::debug!(thread_id, run_id = %run_id, "Run created, polling for completion");
        self.wait_for_run(thread_id, run).await?;
        self.latest_reply(thread_id, &run_id).await
    }
}

fn run_failure(status: RunStatus, last_error: Option<&RunError>) -> GatewayError {
    let detail = last_error.map_or_else(
        || "no details".to_string(),
        |e| format!("{}: {}", e.code, e.message),
    );
    match status {
        RunStatus::RequiresAction => {
            GatewayError::failed("Assistant requested a tool call, which is not supported")
        }
        other => GatewayError::failed(format!("Run ended with status {other:?} ({detail})")),
    }
}

/// Concatenate the text blocks of the newest assistant message
fn extract_reply(list: MessageList) -> Result<String, GatewayError> {
    let message = list
        .data
        .into_iter()
        .find(|m| m.role == "assistant")
        .ok_or_else(|| GatewayError::failed("Run completed without an assistant message"))?;

    let text = message
        .content
        .into_iter()
        .filter_map(|block| match block {
            MessageContent::Text { text } => Some(text.value),
            MessageContent::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    if text.trim().is_empty() {
        return Err(GatewayError::failed("Assistant message contained no text"));
    }
    Ok(text)
}

// Wire types

#[derive(Debug, Deserialize)]
struct ObjectRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Run {
    id: String,
    status: RunStatus,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct RunError {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageContent {
    Text {
        text: TextValue,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

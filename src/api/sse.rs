//! Server-Sent Events support

use crate::session::{SessionEvent, SessionSnapshot};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Snapshot as an `init` event, followed by every session change
pub fn sse_stream(
    snapshot: SessionSnapshot,
    broadcast_rx: broadcast::Receiver<SessionEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move {
        Ok(to_sse(
            "init",
            &json!({
                "type": "init",
                "session": snapshot,
            }),
        ))
    });

    let updates = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(session_event_to_sse(event))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(init.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn session_event_to_sse(event: SessionEvent) -> Event {
    match event {
        SessionEvent::Message { message } => to_sse(
            "message",
            &json!({
                "type": "message",
                "message": message,
            }),
        ),
        SessionEvent::StateChange { busy } => to_sse(
            "state_change",
            &json!({
                "type": "state_change",
                "busy": busy,
            }),
        ),
        SessionEvent::Error { kind, message } => to_sse(
            "error",
            &json!({
                "type": "error",
                "kind": kind,
                "message": message,
            }),
        ),
    }
}

fn to_sse(event_type: &str, data: &serde_json::Value) -> Event {
    Event::default().event(event_type).data(data.to_string())
}


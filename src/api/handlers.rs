//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    AdvisorsResponse, ChatRequest, ChatResponse, CreateSessionRequest, ErrorResponse,
    SuccessResponse, UiCopy,
};
use super::AppState;
use crate::controller::TurnError;
use crate::gateway::GatewayErrorKind;
use crate::session::{ConversationSession, SessionSnapshot};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Advisors and UI copy
        .route("/api/advisors", get(list_advisors))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        // Turns
        .route("/api/sessions/:id/chat", post(send_chat))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Advisors
// ============================================================

async fn list_advisors(State(state): State<AppState>) -> Json<AdvisorsResponse> {
    let advisors = state.advisors();
    Json(AdvisorsResponse {
        advisors: advisors.list().iter().map(|a| (**a).clone()).collect(),
        default: advisors.default_advisor_id().map(str::to_string),
        ui: UiCopy::default(),
    })
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    // The body is optional; an empty one means "use the defaults"
    let req: CreateSessionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSessionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?
    };
    let advisors = state.advisors();

    let advisor = match req.advisor {
        Some(id) => advisors
            .get(&id)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown advisor: {id}")))?,
        None => advisors.default().ok_or_else(|| {
            AppError::ServiceUnavailable("No advisors are configured".to_string())
        })?,
    };

    let session = state.sessions.create(advisor).await;
    Ok((StatusCode::CREATED, Json(session.snapshot())))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = find_session(&state, &id).await?;
    Ok(Json(session.snapshot()))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .sessions
        .remove(&id)
        .await
        .ok_or_else(|| session_not_found(&id))?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = find_session(&state, &id).await?;
    let (snapshot, broadcast_rx) = session.subscribe();
    Ok(sse_stream(snapshot, broadcast_rx))
}

// ============================================================
// Turns
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let session = find_session(&state, &id).await?;
    let message = state
        .controller
        .submit(&session, &req.text, req.advisor.as_deref())
        .await?;
    Ok(Json(ChatResponse { message }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("solar-advisor ", env!("CARGO_PKG_VERSION"))
}

async fn find_session(state: &AppState, id: &str) -> Result<Arc<ConversationSession>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| session_not_found(id))
}

fn session_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Session not found: {id}"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    ServiceUnavailable(String),
    GatewayTimeout(String),
    Internal(String),
}

impl From<TurnError> for AppError {
    fn from(e: TurnError) -> Self {
        let message = e.to_string();
        match e {
            TurnError::EmptyInput | TurnError::UnknownAdvisor(_) => AppError::BadRequest(message),
            TurnError::TurnAlreadyInFlight => AppError::Conflict(message),
            TurnError::Gateway(e) => match e.kind {
                GatewayErrorKind::Unavailable => AppError::ServiceUnavailable(message),
                GatewayErrorKind::Timeout => AppError::GatewayTimeout(message),
                GatewayErrorKind::Failed => AppError::BadGateway(message),
            },
            TurnError::Internal(_) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

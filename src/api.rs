//! HTTP API for the Solar Advisor chat

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::advisor::AdvisorRegistry;
use crate::controller::TurnController;
use crate::gateway::AssistantGateway;
use crate::session::SessionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub controller: Arc<TurnController<dyn AssistantGateway>>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn AssistantGateway>, advisors: Arc<AdvisorRegistry>) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new()),
            controller: Arc::new(TurnController::new(gateway, advisors)),
        }
    }

    pub fn advisors(&self) -> &AdvisorRegistry {
        self.controller.advisors()
    }
}

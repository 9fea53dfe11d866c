//! Solar Advisor - chat front end for hosted solar-policy assistants
//!
//! Each browser session holds one conversation with an advisor backed by
//! the `OpenAI` Assistants API, one turn at a time.

mod advisor;
mod api;
mod config;
mod controller;
mod gateway;
mod session;
mod state_machine;

use advisor::AdvisorRegistry;
use api::{create_router, AppState};
use config::AppConfig;
use gateway::{AssistantGateway, LoggingGateway, OpenAiAssistantsGateway};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solar_advisor=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();

    // Advisors
    let advisors = Arc::new(AdvisorRegistry::new(&config.advisors));
    if advisors.has_advisors() {
        tracing::info!(
            advisors = ?advisors.list().iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
            default = ?advisors.default_advisor_id(),
            "Advisor registry initialized"
        );
    } else {
        tracing::warn!("No advisors configured. Set NY_ADVISOR or MD_ADVISOR.");
    }

    // Gateway
    let api_key = config.openai_api_key.clone().unwrap_or_default();
    if api_key.is_empty() {
        tracing::warn!("No OpenAI API key configured. Set OPENAI_API_KEY.");
    }
    let openai = OpenAiAssistantsGateway::new(
        api_key,
        config.openai_base_url.as_deref(),
        config.poll,
    )?;
    let gateway: Arc<dyn AssistantGateway> = Arc::new(LoggingGateway::new(openai));

    // Create application state
    let state = AppState::new(gateway, advisors);
    state.sessions.spawn_reaper(config.session_ttl);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Solar Advisor server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

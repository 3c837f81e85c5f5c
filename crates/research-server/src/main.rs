//! deep-research HTTP Server
//!
//! Axum-based server exposing the research agent as a server-sent-event
//! stream. Each request spawns its own tool-server process and runs one
//! research call to completion or failure.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use research_core::{AgentConfig, LlmProvider, Researcher};
use research_runtime::{NvidiaProvider, StdioToolServer};

use crate::config::ServerConfig;
use crate::handlers::{chat_handler, health_check};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment first so RUST_LOG from .env applies
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize LLM provider
    let provider = Arc::new(NvidiaProvider::from_env()?);

    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to {} ({})", provider.name(), provider.model()),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ {} endpoint not reachable - research calls will fail", provider.name());
            tracing::warn!("  Check NVIDIA_API_KEY and NVIDIA_BASE_URL");
        }
    }

    // Tool server is spawned per research call
    let tools = Arc::new(StdioToolServer::from_env());
    tracing::info!("Tool server command: {}", tools.config().command_line());

    let state = AppState {
        researcher: Researcher::new(provider, tools, AgentConfig::default()),
    };

    let app = router(state);

    // Start server
    let config = ServerConfig::from_env();
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 deep-research server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health   - Health check");
    tracing::info!("  POST /api/chat - Research a query (text/event-stream)");

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    // Open CORS for local front-end development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

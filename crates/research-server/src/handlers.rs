//! HTTP Handlers

use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use research_core::AgentEvent;

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model: String,
    pub provider_connected: bool,
    pub tool_server: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider = state.researcher.provider();
    let provider_connected = provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model: provider.model().to_string(),
        provider_connected,
        tool_server: state.researcher.tools().describe(),
    })
}

/// Research endpoint: streams progress events as server-sent events.
///
/// Every event goes out under the `message` name except the two terminal
/// ones, which use `done` and `error`.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!(query_len = payload.query.len(), "Research requested");

    let stream = state
        .researcher
        .research(payload.query)
        .map(|event| Ok(to_frame(&event)));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn frame_name(event: &AgentEvent) -> &'static str {
    match event {
        AgentEvent::Done => "done",
        AgentEvent::Error { .. } => "error",
        _ => "message",
    }
}

fn to_frame(event: &AgentEvent) -> Event {
    Event::default()
        .event(frame_name(event))
        .json_data(event)
        .unwrap_or_else(|e| {
            tracing::error!(kind = event.kind(), error = %e, "Could not encode event");
            Event::default()
                .event("error")
                .data(r#"{"type":"error","message":"event encoding failed"}"#)
        })
}

//! Progress Events
//!
//! The ordered, typed protocol a research call emits. Each event
//! serializes to one JSON object tagged by `type`:
//!
//! | type          | fields           |
//! |---------------|------------------|
//! | `status`      | `message`        |
//! | `reasoning`   | `content`        |
//! | `tool_call`   | `tool`, `args`   |
//! | `links_found` | `links`          |
//! | `answer`      | `content`        |
//! | `error`       | `message`        |
//! | `done`        |                  |

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{AgentError, Result};
use crate::tool::ToolArguments;

/// A search result surfaced to the consumer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub title: String,
    pub url: String,
}

/// One progress event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Status { message: String },
    Reasoning { content: String },
    ToolCall { tool: String, args: ToolArguments },
    LinksFound { links: Vec<Link> },
    Answer { content: String },
    Error { message: String },
    /// Synthetic marker closing a successful stream
    Done,
}

impl AgentEvent {
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }

    pub fn answer(content: impl Into<String>) -> Self {
        Self::Answer {
            content: content.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The `type` tag this event serializes with
    pub fn kind(&self) -> &'static str {
        match self {
            AgentEvent::Status { .. } => "status",
            AgentEvent::Reasoning { .. } => "reasoning",
            AgentEvent::ToolCall { .. } => "tool_call",
            AgentEvent::LinksFound { .. } => "links_found",
            AgentEvent::Answer { .. } => "answer",
            AgentEvent::Error { .. } => "error",
            AgentEvent::Done => "done",
        }
    }

    /// Whether the stream ends after this event
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Done | AgentEvent::Error { .. })
    }
}

/// Read a search tool's result as a list of links.
///
/// Returns `None` unless the text is a JSON array; entries that are not
/// objects are skipped, missing fields become empty strings.
pub fn links_from_search_results(text: &str) -> Option<Vec<Link>> {
    let Value::Array(entries) = serde_json::from_str::<Value>(text).ok()? else {
        return None;
    };

    let field = |entry: &Value, key: &str| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Some(
        entries
            .iter()
            .filter(|entry| entry.is_object())
            .map(|entry| Link {
                title: field(entry, "title"),
                url: field(entry, "url"),
            })
            .collect(),
    )
}

/// Lazy, finite, forward-only sequence of events for one research call
pub type EventStream = Pin<Box<dyn Stream<Item = AgentEvent> + Send>>;

/// Sending half of an event stream.
///
/// Events go out in emission order; a closed receiver means the consumer
/// is gone and the loop must stop.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::Sender<AgentEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<AgentEvent>) -> Self {
        Self { tx }
    }

    pub async fn emit(&self, event: AgentEvent) -> Result<()> {
        tracing::debug!(kind = event.kind(), "Emitting event");
        self.tx
            .send(event)
            .await
            .map_err(|_| AgentError::ConsumerGone)
    }
}

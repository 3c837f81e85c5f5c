//! Research Entry Point
//!
//! `Researcher::research` is the only inbound operation. It returns an event
//! stream that always terminates: with `Done` after the answer, or with a
//! single `Error` carrying the formatted cause chain.
//!
//! The tool session is opened per call and closed on every exit path. If the
//! consumer drops the stream, the next emit fails and the call winds down
//! the same way.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;

use crate::agent::{AgentConfig, AgentLoop};
use crate::error::{AgentError, Result};
use crate::event::{AgentEvent, EventSink, EventStream};
use crate::provider::LlmProvider;
use crate::tool::{ToolInvoker, ToolSessionFactory};

const EVENT_BUFFER: usize = 64;

/// Runs research calls against one provider and tool source
#[derive(Clone)]
pub struct Researcher {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<dyn ToolSessionFactory>,
    config: Arc<AgentConfig>,
}

impl Researcher {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<dyn ToolSessionFactory>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config: Arc::new(config),
        }
    }

    pub fn with_defaults(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<dyn ToolSessionFactory>,
    ) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn tools(&self) -> &Arc<dyn ToolSessionFactory> {
        &self.tools
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Start a research call. Must be called within a tokio runtime.
    pub fn research(&self, query: impl Into<String>) -> EventStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let span = tracing::info_span!("research", id = %uuid::Uuid::new_v4());
        let this = self.clone();
        let query = query.into();

        tokio::spawn(async move { this.drive(query, EventSink::new(tx)).await }.instrument(span));

        Box::pin(ReceiverStream::new(rx))
    }

    async fn drive(self, query: String, sink: EventSink) {
        tracing::info!(query = %query, "Research started");

        // Backstop for panics while opening or closing the session
        let outcome = AssertUnwindSafe(self.run_session(&query, &sink))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(panic_error(panic.as_ref())));

        let terminal = match outcome {
            Ok(()) => {
                tracing::info!("Research finished");
                AgentEvent::Done
            }
            Err(AgentError::ConsumerGone) => {
                tracing::debug!("Consumer disconnected; research abandoned");
                return;
            }
            Err(err) => {
                let report = err.report();
                tracing::error!(error = %report, "Research failed");
                AgentEvent::error(report)
            }
        };

        if sink.emit(terminal).await.is_err() {
            tracing::debug!("Consumer disconnected before the terminal event");
        }
    }

    async fn run_session(&self, query: &str, sink: &EventSink) -> Result<()> {
        let session = self.tools.open().await?;
        let mut invoker = ToolInvoker::new(session);

        // A panicking loop still reaches `close` below
        let outcome = AssertUnwindSafe(
            AgentLoop::new(self.provider.as_ref(), &self.config, &mut invoker, sink).run(query),
        )
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(panic_error(panic.as_ref())));

        if let Err(e) = invoker.close().await {
            tracing::warn!(error = %e, "Failed to close tool session");
        }

        outcome.map(|state| {
            tracing::debug!(
                iterations = state.iteration,
                messages = state.conversation.len(),
                "Research loop complete"
            );
        })
    }
}

fn panic_error(panic: &(dyn Any + Send)) -> AgentError {
    let reason = panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into());
    anyhow::anyhow!("research loop panicked: {reason}").into()
}

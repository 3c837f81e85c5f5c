//! LLM Provider Strategy Pattern
//!
//! Defines the interface the agent loop uses to talk to a model-serving
//! endpoint. Implementations own the wire format, credentials and base URL;
//! the loop only sees provider-agnostic messages.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use research_core::provider::LlmProvider;
//!
//! let provider = NvidiaProvider::new(config)?;
//!
//! // With tools bound
//! let reply = provider.complete(&messages, Some(catalog.descriptors())).await?;
//!
//! // Tools disabled
//! let reply = provider.complete(&messages, None).await?;
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::message::{AssistantMessage, Message};
use crate::tool::ToolDescriptor;

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs and health reports
    fn name(&self) -> &str;

    /// Model identifier requests are sent to
    fn model(&self) -> &str;

    /// Check if the provider is reachable and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Generate one assistant turn.
    ///
    /// `tools: None` disables tool binding for this call.
    async fn complete(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDescriptor]>,
    ) -> Result<AssistantMessage>;
}

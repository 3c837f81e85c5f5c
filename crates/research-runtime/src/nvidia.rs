//! NVIDIA LLM Provider
//!
//! Implementation of `LlmProvider` for NVIDIA's hosted, OpenAI-compatible
//! chat-completions endpoint. Payload shaping lives in [`crate::wire`].

use std::time::Duration;

use async_trait::async_trait;
use research_core::{
    AgentError, AssistantMessage, LlmProvider, Message, Result, ToolDescriptor,
};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::wire::{self, ChatCompletionResponse, MODEL_ID};

/// NVIDIA provider configuration
#[derive(Clone)]
pub struct NvidiaConfig {
    /// Bearer credential
    pub api_key: String,

    /// Endpoint root, without a trailing slash
    pub base_url: String,

    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for NvidiaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://integrate.api.nvidia.com/v1".into(),
            timeout_secs: 300,
        }
    }
}

impl std::fmt::Debug for NvidiaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NvidiaConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl NvidiaConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = std::env::var("NVIDIA_API_KEY").unwrap_or_default();
        let base_url = std::env::var("NVIDIA_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);
        let timeout_secs = std::env::var("NVIDIA_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        Self {
            api_key,
            base_url,
            timeout_secs,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

/// NVIDIA LLM provider
pub struct NvidiaProvider {
    client: Client,
    config: NvidiaConfig,
}

impl NvidiaProvider {
    /// Create from configuration
    pub fn from_config(config: NvidiaConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AgentError::Config("NVIDIA_API_KEY is not set".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(NvidiaConfig::from_env())
    }

    pub fn config(&self) -> &NvidiaConfig {
        &self.config
    }
}

#[async_trait]
impl LlmProvider for NvidiaProvider {
    fn name(&self) -> &str {
        "NVIDIA"
    }

    fn model(&self) -> &str {
        MODEL_ID
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.config.endpoint("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => Ok(true),
            Ok(r) => {
                tracing::warn!(status = %r.status(), "NVIDIA health check failed");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("NVIDIA health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDescriptor]>,
    ) -> Result<AssistantMessage> {
        let request = wire::encode(messages, tools);
        tracing::debug!(
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "Sending chat completion"
        );

        let response = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::unavailable("chat completion request failed", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::unavailable("reading chat completion body failed", e))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| AgentError::ResponseParse(format!("{e}: {}", preview(&body))))?;

        wire::decode(parsed)
    }
}

fn status_error(status: StatusCode, body: &str) -> AgentError {
    AgentError::HttpStatus {
        status: status.as_u16(),
        message: error_message(body),
    }
}

/// Pull a readable message out of an error body.
///
/// Handles `{"error": {"message": ..}}`, `{"error": ".."}`, `{"detail": ..}`
/// and `{"message": ..}`; anything else is returned as a truncated preview.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return preview(body);
    };

    let candidates = [
        value.pointer("/error/message"),
        value.get("error"),
        value.get("detail"),
        value.get("message"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(Value::as_str)
        .map_or_else(|| preview(body), ToString::to_string)
}

fn preview(body: &str) -> String {
    const LIMIT: usize = 500;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

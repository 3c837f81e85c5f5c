//! Tool System
//!
//! Tools are not implemented here. They live behind a tool-execution
//! session (an MCP server, a test double, ...) that can list tools and
//! invoke one by name with a JSON argument object.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::ToolCatalog;
use crate::error::{Result, ToolError};

/// Tool arguments: always a JSON object
pub type ToolArguments = Map<String, Value>;

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID assigned by the endpoint, or synthesized by the loop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolCall {
    /// Create a call without an id. Non-object arguments become `{}`.
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments: into_arguments(arguments),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The call id, empty if none has been assigned yet
    pub fn call_id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Assign `call_<iteration>_<index>` when the endpoint sent no id.
    pub fn ensure_id(&mut self, iteration: usize, index: usize) {
        if self.id.as_deref().is_none_or(str::is_empty) {
            self.id = Some(format!("call_{iteration}_{index}"));
        }
    }
}

/// Coerce any JSON value into an argument object.
pub fn into_arguments(value: Value) -> ToolArguments {
    match value {
        Value::Object(map) => map,
        _ => ToolArguments::new(),
    }
}

/// Tool definition as listed by the tool-execution session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawTool {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// JSON Schema for the arguments
    #[serde(default)]
    pub input_schema: Value,
}

/// Tool definition as offered to the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,

    /// Never empty
    pub description: String,

    /// JSON Schema object; every property carries a description
    pub parameters: Value,
}

/// One content fragment of a tool reply
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolContent {
    Text(String),
    /// Non-text content (image, resource, ...), identified by its type tag
    Other(String),
}

/// Reply of a tool-execution session to one call
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: Vec<ToolContent>,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text(text.into())],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text(text.into())],
            is_error: true,
        }
    }

    /// Text fragments joined with a newline; non-text fragments are skipped.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                ToolContent::Text(text) => Some(text.as_str()),
                ToolContent::Other(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A stateful connection to a tool-execution collaborator.
///
/// Scoped to one research call: opened at loop start and closed on every
/// exit path. Must be `Sync`: the loop future borrowing it is spawned.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// List the tools this session offers
    async fn list_tools(&mut self) -> Result<Vec<RawTool>>;

    /// Invoke a tool by name
    async fn call_tool(&mut self, name: &str, arguments: &ToolArguments) -> Result<ToolOutput>;

    /// Shut the session and its underlying process/transport down
    async fn close(&mut self) -> Result<()>;
}

/// Opens a fresh tool session per research call
#[async_trait]
pub trait ToolSessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn ToolSession>>;

    /// Short human-readable description (command line, URL, ...)
    fn describe(&self) -> String;
}

/// Session-bound bridge between the loop and the tool-execution session.
pub struct ToolInvoker {
    session: Box<dyn ToolSession>,
}

impl ToolInvoker {
    pub fn new(session: Box<dyn ToolSession>) -> Self {
        Self { session }
    }

    /// Fetch the session's tool listing and build the model-facing catalog.
    pub async fn catalog(&mut self) -> Result<ToolCatalog> {
        let raw = self.session.list_tools().await?;
        tracing::debug!(count = raw.len(), "Fetched tool listing");
        Ok(ToolCatalog::build(raw))
    }

    /// Invoke a tool; every failure comes back as a `ToolError`.
    pub async fn invoke(
        &mut self,
        name: &str,
        arguments: &ToolArguments,
    ) -> std::result::Result<String, ToolError> {
        tracing::debug!(tool = %name, "Executing tool");

        match self.session.call_tool(name, arguments).await {
            Ok(output) if output.is_error => {
                let message = output.joined_text();
                tracing::warn!(tool = %name, %message, "Tool reported an error");
                Err(ToolError::new(name, message))
            }
            Ok(output) => Ok(output.joined_text()),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool invocation failed");
                Err(ToolError::new(name, e.to_string()))
            }
        }
    }

    pub async fn close(&mut self) -> Result<()> {
        self.session.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::testing::ScriptedSession;
    use serde_json::json;

    #[test]
    fn test_tool_call_arguments_coerced_to_object() {
        let call = ToolCall::new("search_web", json!([1, 2, 3]));
        assert!(call.arguments.is_empty());

        let call = ToolCall::new("search_web", json!({"query": "rust"}));
        assert_eq!(call.arguments.get("query"), Some(&json!("rust")));
    }

    #[test]
    fn test_ensure_id_keeps_endpoint_id() {
        let mut call = ToolCall::new("scrape_page", json!({})).with_id("chatcmpl-tool-1");
        call.ensure_id(3, 0);
        assert_eq!(call.call_id(), "chatcmpl-tool-1");

        let mut call = ToolCall::new("scrape_page", json!({}));
        call.ensure_id(3, 1);
        assert_eq!(call.call_id(), "call_3_1");

        let mut call = ToolCall::new("scrape_page", json!({})).with_id("");
        call.ensure_id(2, 0);
        assert_eq!(call.call_id(), "call_2_0");
    }

    #[test]
    fn test_joined_text_skips_non_text() {
        let output = ToolOutput {
            content: vec![
                ToolContent::Text("first".into()),
                ToolContent::Other("image".into()),
                ToolContent::Text("second".into()),
            ],
            is_error: false,
        };
        assert_eq!(output.joined_text(), "first\nsecond");
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let session = ScriptedSession::new().reply("search_web", Ok(ToolOutput::text("[]")));
        let mut invoker = ToolInvoker::new(Box::new(session));

        let result = invoker.invoke("search_web", &ToolArguments::new()).await;
        assert_eq!(result, Ok("[]".to_string()));
    }

    #[tokio::test]
    async fn test_invoke_session_failure_becomes_tool_error() {
        let session = ScriptedSession::new().reply(
            "scrape_page",
            Err(AgentError::ToolSession("connection refused".into())),
        );
        let mut invoker = ToolInvoker::new(Box::new(session));

        let err = invoker
            .invoke("scrape_page", &ToolArguments::new())
            .await
            .unwrap_err();
        assert_eq!(err.tool, "scrape_page");
        assert_eq!(
            err.to_string(),
            "Error executing tool scrape_page: Tool session error: connection refused"
        );
    }

    #[tokio::test]
    async fn test_invoke_is_error_output_becomes_tool_error() {
        let session = ScriptedSession::new()
            .reply("scrape_page", Ok(ToolOutput::error("Missing arguments")));
        let mut invoker = ToolInvoker::new(Box::new(session));

        let err = invoker
            .invoke("scrape_page", &ToolArguments::new())
            .await
            .unwrap_err();
        assert_eq!(err.message, "Missing arguments");
    }
}

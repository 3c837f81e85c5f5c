//! MCP Tool Sessions
//!
//! Spawns the tool server as a child process and speaks the Model Context
//! Protocol to it over stdio through `rmcp`. The client service answers
//! server-initiated requests such as `ping` on its own.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use research_core::{
    AgentError, RawTool, Result, ToolArguments, ToolContent, ToolOutput, ToolSession,
    ToolSessionFactory,
};
use rmcp::model::{CallToolRequestParam, CallToolResult, Tool};
use rmcp::service::{RoleClient, RunningService};
use rmcp::{ServiceExt, transport::TokioChildProcess};
use serde_json::Value;
use tokio::process::Command;

type McpPeer = RunningService<RoleClient, ()>;

/// How to launch the tool server
#[derive(Clone, Debug)]
pub struct StdioServerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,

    /// Per-request timeout, handshake included
    pub request_timeout: Duration,

    /// Upper bound on session shutdown
    pub shutdown_timeout: Duration,
}

impl Default for StdioServerConfig {
    fn default() -> Self {
        Self {
            command: "python".into(),
            args: vec!["mcp_server.py".into()],
            env: HashMap::new(),
            cwd: None,
            request_timeout: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl StdioServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let command = std::env::var("RESEARCH_TOOL_COMMAND").unwrap_or(defaults.command);
        let args = std::env::var("RESEARCH_TOOL_ARGS")
            .map(|a| a.split_whitespace().map(String::from).collect())
            .unwrap_or(defaults.args);

        Self {
            command,
            args,
            ..defaults
        }
    }

    /// Command line as typed in a shell
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Spawns one tool-server process per research call
#[derive(Clone, Debug)]
pub struct StdioToolServer {
    config: StdioServerConfig,
}

impl StdioToolServer {
    pub fn new(config: StdioServerConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(StdioServerConfig::from_env())
    }

    pub fn config(&self) -> &StdioServerConfig {
        &self.config
    }

    fn command(&self) -> Command {
        let config = &self.config;
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(cwd) = &config.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

#[async_trait]
impl ToolSessionFactory for StdioToolServer {
    async fn open(&self) -> Result<Box<dyn ToolSession>> {
        let config = &self.config;
        tracing::info!(command = %config.command_line(), "Starting MCP server process");

        let mut cmd = self.command();
        let transport = TokioChildProcess::new(&mut cmd)
            .map_err(|e| AgentError::startup(format!("spawn `{}`", config.command_line()), e))?;

        // Dropping the pending handshake drops the transport and its child
        let peer = tokio::time::timeout(config.request_timeout, ().serve(transport))
            .await
            .map_err(|_| {
                AgentError::startup(
                    "MCP handshake failed",
                    AgentError::Timeout(format!(
                        "no initialize response within {}ms",
                        config.request_timeout.as_millis()
                    )),
                )
            })?
            .map_err(|e| AgentError::startup("MCP handshake failed", e))?;

        tracing::debug!(server = ?peer.peer_info(), "MCP session initialized");

        Ok(Box::new(StdioToolSession {
            peer: Some(peer),
            request_timeout: config.request_timeout,
            shutdown_timeout: config.shutdown_timeout,
        }))
    }

    fn describe(&self) -> String {
        self.config.command_line()
    }
}

/// Live MCP session bound to a child process
pub struct StdioToolSession {
    peer: Option<McpPeer>,
    request_timeout: Duration,
    shutdown_timeout: Duration,
}

impl StdioToolSession {
    fn peer(&self) -> Result<&McpPeer> {
        self.peer
            .as_ref()
            .ok_or_else(|| AgentError::ToolSession("MCP session is closed".into()))
    }
}

#[async_trait]
impl ToolSession for StdioToolSession {
    async fn list_tools(&mut self) -> Result<Vec<RawTool>> {
        let tools = bounded("tools/list", self.request_timeout, self.peer()?.list_all_tools()).await?;
        tools.iter().map(raw_tool).collect()
    }

    async fn call_tool(&mut self, name: &str, arguments: &ToolArguments) -> Result<ToolOutput> {
        let param = CallToolRequestParam {
            name: name.to_string().into(),
            arguments: Some(arguments.clone()),
        };
        let result = bounded("tools/call", self.request_timeout, self.peer()?.call_tool(param)).await?;
        Ok(tool_output(&result))
    }

    async fn close(&mut self) -> Result<()> {
        let Some(peer) = self.peer.take() else {
            return Ok(());
        };

        // Cancelling the service drops the transport, which ends the child
        match tokio::time::timeout(self.shutdown_timeout, peer.cancel()).await {
            Ok(Ok(reason)) => {
                tracing::debug!(?reason, "MCP session closed");
                Ok(())
            }
            Ok(Err(e)) => Err(AgentError::ToolSession(format!("MCP service task failed: {e}"))),
            Err(_) => {
                tracing::warn!("MCP session did not shut down in time");
                Err(AgentError::Timeout(format!(
                    "MCP shutdown took longer than {}ms",
                    self.shutdown_timeout.as_millis()
                )))
            }
        }
    }
}

async fn bounded<T, E: Display>(
    method: &str,
    limit: Duration,
    request: impl Future<Output = std::result::Result<T, E>>,
) -> Result<T> {
    match tokio::time::timeout(limit, request).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(AgentError::ToolSession(format!("MCP `{method}` failed: {e}"))),
        Err(_) => Err(AgentError::Timeout(format!(
            "MCP `{method}` timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

fn raw_tool(tool: &Tool) -> Result<RawTool> {
    let listed = serde_json::to_value(tool)?;
    let text = |key: &str| listed.get(key).and_then(Value::as_str).map(str::to_string);

    Ok(RawTool {
        name: text("name").unwrap_or_default(),
        description: text("description").filter(|d| !d.trim().is_empty()),
        input_schema: listed.get("inputSchema").cloned().unwrap_or(Value::Null),
    })
}

fn tool_output(result: &CallToolResult) -> ToolOutput {
    let content = serde_json::to_value(&result.content)
        .ok()
        .and_then(|v| match v {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .unwrap_or_default()
        .iter()
        .map(content_fragment)
        .collect();

    ToolOutput {
        content,
        is_error: result.is_error.unwrap_or(false),
    }
}

fn content_fragment(item: &Value) -> ToolContent {
    let kind = item.get("type").and_then(Value::as_str).unwrap_or("unknown");
    match (kind, item.get("text").and_then(Value::as_str)) {
        ("text", Some(text)) => ToolContent::Text(text.to_string()),
        _ => ToolContent::Other(kind.to_string()),
    }
}

//! Error Types

use std::error::Error as StdError;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Boxed error used as the `source` of wrapped failures
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Agent error types
///
/// Everything here is an uncaught fault from the loop's point of view: it
/// ends the research call with a single error event. Tool failures and
/// malformed model output are recovered locally and never become an
/// `AgentError`.
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unreachable (connect failure, timeout, TLS, ...)
    #[error("Provider unavailable: {message}")]
    ProviderUnavailable {
        message: String,
        #[source]
        source: BoxError,
    },

    /// Provider answered with a non-success status
    #[error("Provider returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Provider reply could not be understood
    #[error("Malformed provider response: {0}")]
    ResponseParse(String),

    /// Tool-execution session failed outside of a single tool call
    #[error("Tool session error: {0}")]
    ToolSession(String),

    /// Tool-execution session could not be started
    #[error("Failed to start tool session: {message}")]
    ToolSessionStartup {
        message: String,
        #[source]
        source: BoxError,
    },

    /// Tool protocol violation (bad JSON-RPC frame, missing result, ...)
    #[error("Tool protocol error: {0}")]
    Protocol(String),

    /// A request did not complete in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The event consumer went away; the call stops quietly
    #[error("Event consumer disconnected")]
    ConsumerGone,

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AgentError {
    pub fn unavailable(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::ProviderUnavailable {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn startup(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::ToolSessionStartup {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Render the error together with its full cause chain.
    pub fn report(&self) -> String {
        let mut report = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            report.push_str("\nCaused by: ");
            report.push_str(&cause.to_string());
            source = cause.source();
        }
        report
    }
}

/// A failed tool invocation.
///
/// Never aborts the loop; it is handed back to the model as a tool message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Error executing tool {tool}: {message}")]
pub struct ToolError {
    pub tool: String,
    pub message: String,
}

impl ToolError {
    pub fn new(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

//! # research-runtime
//!
//! Concrete collaborators for research-core.
//!
//! ## Providers
//!
//! - **NVIDIA** (default): hosted chat-completions endpoint with tool calling
//!
//! ## Tool sessions
//!
//! - **MCP over stdio** (default): spawns a tool server and drives it through
//!   an `rmcp` client service
//!
//! ## Usage
//!
//! ```rust,ignore
//! use research_runtime::{NvidiaProvider, StdioToolServer};
//!
//! let provider = NvidiaProvider::from_env()?;
//! let tools = StdioToolServer::from_env();
//! let researcher = Researcher::with_defaults(Arc::new(provider), Arc::new(tools));
//! ```

pub mod wire;

#[cfg(feature = "nvidia")]
pub mod nvidia;

#[cfg(feature = "mcp")]
pub mod mcp;

#[cfg(feature = "nvidia")]
pub use nvidia::{NvidiaConfig, NvidiaProvider};

#[cfg(feature = "mcp")]
pub use mcp::{StdioServerConfig, StdioToolServer, StdioToolSession};

// Re-export core types for convenience
pub use research_core::{
    AgentConfig, AgentError, AgentEvent, EventStream, LlmProvider, Message, Researcher, Result,
    ToolSession, ToolSessionFactory,
};

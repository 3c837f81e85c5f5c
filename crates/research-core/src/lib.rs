//! # research-core
//!
//! Provider-agnostic research agent: an iterative tool-calling loop that
//! streams typed progress events.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Researcher                            │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │  AgentLoop  │──│  ToolInvoker │──│  ToolSession        │  │
//! │  │             │  │  ToolCatalog │  │  (collaborator)     │  │
//! │  └─────────────┘  └──────────────┘  └─────────────────────┘  │
//! │         │                                                    │
//! │         ├──► LlmProvider (strategy; owns the wire format)    │
//! │         └──► EventSink ──► EventStream (consumer)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` and `ToolSession` traits keep the loop independent of
//! any model endpoint or tool transport.

pub mod agent;
pub mod catalog;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod recovery;
pub mod researcher;
pub mod tool;

#[cfg(test)]
mod testing;

pub use agent::{AgentConfig, AgentLoop, AgentState, Phase};
pub use catalog::ToolCatalog;
pub use error::{AgentError, Result, ToolError};
pub use event::{AgentEvent, EventStream, Link};
pub use message::{AssistantMessage, Conversation, Message, Role};
pub use provider::LlmProvider;
pub use researcher::Researcher;
pub use tool::{
    RawTool, ToolArguments, ToolCall, ToolContent, ToolDescriptor, ToolInvoker, ToolOutput,
    ToolSession, ToolSessionFactory,
};

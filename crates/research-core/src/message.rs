//! Conversation Messages
//!
//! Provider-agnostic message model. Wire adapters translate it to and from
//! whatever shape a model-serving endpoint expects.

use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tool::ToolCall;

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result (answers one assistant tool call)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// An assistant turn as decoded from the model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    /// Visible text, with any reasoning segment already removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Tool calls in the order the model issued them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Extracted reasoning segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl AssistantMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Visible text, empty when the model sent none.
    pub fn visible_text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Reasoning segment, if a non-empty one was extracted.
    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref().filter(|r| !r.trim().is_empty())
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant(AssistantMessage),
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Create a plain-text assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant(AssistantMessage::text(content))
    }

    /// Create a tool result message
    pub fn tool(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a tool message reporting a failed invocation
    pub fn tool_error(tool_call_id: impl Into<String>, error: &ToolError) -> Self {
        Self::tool(tool_call_id, error.tool.clone(), error.to_string())
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant(_) => Role::Assistant,
            Message::Tool { .. } => Role::Tool,
        }
    }

    /// Text content, if the message has any
    pub fn content(&self) -> Option<&str> {
        match self {
            Message::System { content } | Message::User { content } => Some(content.as_str()),
            Message::Tool { content, .. } => Some(content.as_str()),
            Message::Assistant(reply) => reply.content.as_deref(),
        }
    }
}

impl From<AssistantMessage> for Message {
    fn from(reply: AssistantMessage) -> Self {
        Self::Assistant(reply)
    }
}

/// Ordered conversation history for one research call
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut conv = Self::new();
        conv.push(Message::system(prompt));
        conv
    }

    /// Add a message
    pub fn push(&mut self, message: impl Into<Message>) {
        self.messages.push(message.into());
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Ids of tool calls from the latest assistant turn that have no tool
    /// message yet.
    ///
    /// Must be empty whenever the model is invoked.
    pub fn unanswered_tool_calls(&self) -> Vec<&str> {
        let Some(turn) = self
            .messages
            .iter()
            .rposition(|m| matches!(m, Message::Assistant(_)))
        else {
            return Vec::new();
        };

        let Message::Assistant(reply) = &self.messages[turn] else {
            return Vec::new();
        };

        reply
            .tool_calls
            .iter()
            .map(ToolCall::call_id)
            .filter(|id| {
                !self.messages[turn + 1..].iter().any(|m| {
                    matches!(m, Message::Tool { tool_call_id, .. } if tool_call_id.as_str() == *id)
                })
            })
            .collect()
    }
}

impl From<Conversation> for Vec<Message> {
    fn from(conv: Conversation) -> Self {
        conv.messages
    }
}

//! Chat-Completions Wire Adapter
//!
//! Converts `research_core` messages into the OpenAI-style chat-completions
//! payload served by NVIDIA's endpoint, and converts replies back.
//!
//! Provider quirks handled here:
//! - the `/think` directive must lead the conversation as a system entry so
//!   the model produces extended reasoning
//! - reasoning comes back inline as a `<think>...</think>` span, or in a
//!   separate `reasoning_content` field
//! - tool-call arguments arrive as a JSON string that may be malformed

use std::sync::LazyLock;

use regex::Regex;
use research_core::{
    AgentError, AssistantMessage, Message, Result, ToolArguments, ToolCall, ToolDescriptor,
    tool::into_arguments,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Model every request is sent to
pub const MODEL_ID: &str = "nvidia/llama-3.3-nemotron-super-49b-v1.5";
pub const TEMPERATURE: f64 = 0.6;
pub const TOP_P: f64 = 0.95;
pub const MAX_TOKENS: u32 = 65_536;

/// Control token enabling extended reasoning
pub const THINK_DIRECTIVE: &str = "/think";

static THINK_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<think>(.*?)</think>").expect("reasoning pattern is valid")
});

// ============================================================================
// Request
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum WireMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<WireToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl WireMessage {
    fn content(&self) -> Option<&str> {
        match self {
            WireMessage::System { content }
            | WireMessage::User { content }
            | WireMessage::Tool { content, .. } => Some(content.as_str()),
            WireMessage::Assistant { content, .. } => content.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireFunctionCall {
    pub name: String,
    /// JSON-encoded argument object
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Build the request body for `messages`, with `tools` bound if given.
pub fn encode(messages: &[Message], tools: Option<&[ToolDescriptor]>) -> ChatCompletionRequest {
    let mut wire: Vec<WireMessage> = messages.iter().map(encode_message).collect();

    let has_directive = wire
        .iter()
        .any(|m| m.content().is_some_and(|c| c.trim() == THINK_DIRECTIVE));
    if !has_directive {
        wire.insert(
            0,
            WireMessage::System {
                content: THINK_DIRECTIVE.into(),
            },
        );
    }

    ChatCompletionRequest {
        model: MODEL_ID.into(),
        messages: wire,
        tools: tools.map(|tools| tools.iter().map(encode_tool).collect()),
        temperature: TEMPERATURE,
        top_p: TOP_P,
        max_tokens: MAX_TOKENS,
    }
}

fn encode_message(message: &Message) -> WireMessage {
    match message {
        Message::System { content } => WireMessage::System {
            content: content.clone(),
        },
        Message::User { content } => WireMessage::User {
            content: content.clone(),
        },
        Message::Assistant(reply) => WireMessage::Assistant {
            content: reply.content.clone().filter(|c| !c.is_empty()),
            tool_calls: reply.tool_calls.iter().map(encode_tool_call).collect(),
        },
        Message::Tool {
            tool_call_id,
            content,
            ..
        } => WireMessage::Tool {
            tool_call_id: tool_call_id.clone(),
            content: content.clone(),
        },
    }
}

fn encode_tool_call(call: &ToolCall) -> WireToolCall {
    let arguments = serde_json::to_string(&call.arguments).unwrap_or_else(|e| {
        tracing::warn!(tool = %call.name, error = %e, "Could not serialize tool arguments");
        "{}".into()
    });

    WireToolCall {
        id: call.call_id().to_string(),
        kind: "function",
        function: WireFunctionCall {
            name: call.name.clone(),
            arguments,
        },
    }
}

fn encode_tool(tool: &ToolDescriptor) -> WireTool {
    WireTool {
        kind: "function",
        function: WireFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

// ============================================================================
// Reply
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ReplyMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ReplyToolCall>>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub function: ReplyFunction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyFunction {
    pub name: String,
    /// Usually a JSON string; some endpoints send the object itself
    #[serde(default)]
    pub arguments: Value,
}

/// Convert the endpoint's reply into an assistant message.
pub fn decode(response: ChatCompletionResponse) -> Result<AssistantMessage> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::ResponseParse("completion has no choices".into()))?;

    if let Some(reason) = &choice.finish_reason {
        tracing::debug!(finish_reason = %reason, "Completion finished");
    }

    let message = choice.message;
    let (think, content) = extract_reasoning(message.content.as_deref().unwrap_or_default());
    let reasoning = think.or_else(|| {
        message
            .reasoning_content
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
    });

    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall {
            id: tc.id.filter(|id| !id.is_empty()),
            arguments: parse_arguments(&tc.function.name, tc.function.arguments),
            name: tc.function.name,
        })
        .collect();

    Ok(AssistantMessage {
        content: Some(content),
        tool_calls,
        reasoning,
    })
}

/// Split a `<think>...</think>` span out of `content`.
///
/// Without a span the content is returned unchanged. With one, the span is
/// removed and both parts are trimmed.
pub fn extract_reasoning(content: &str) -> (Option<String>, String) {
    let Some(captures) = THINK_SPAN.captures(content) else {
        return (None, content.to_string());
    };
    let (Some(span), Some(inner)) = (captures.get(0), captures.get(1)) else {
        return (None, content.to_string());
    };

    let reasoning = inner.as_str().trim().to_string();
    let visible = format!("{}{}", &content[..span.start()], &content[span.end()..])
        .trim()
        .to_string();

    (Some(reasoning).filter(|r| !r.is_empty()), visible)
}

fn parse_arguments(tool: &str, raw: Value) -> ToolArguments {
    match raw {
        Value::String(text) if text.trim().is_empty() => ToolArguments::new(),
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(value) => into_arguments(value),
            Err(e) => {
                tracing::warn!(%tool, error = %e, "Malformed tool arguments; using {{}}");
                ToolArguments::new()
            }
        },
        other => into_arguments(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(message: Value) -> ChatCompletionResponse {
        serde_json::from_value(json!({
            "model": MODEL_ID,
            "choices": [{"index": 0, "message": message, "finish_reason": "stop"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_encode_prepends_directive_and_fixed_parameters() {
        let request = encode(
            &[Message::system("You research."), Message::user("hi")],
            None,
        );
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], MODEL_ID);
        assert_eq!(body["temperature"], json!(0.6));
        assert_eq!(body["top_p"], json!(0.95));
        assert_eq!(body["max_tokens"], json!(65_536));
        assert!(body.get("tools").is_none());
        assert_eq!(
            body["messages"],
            json!([
                {"role": "system", "content": "/think"},
                {"role": "system", "content": "You research."},
                {"role": "user", "content": "hi"}
            ])
        );
    }

    #[test]
    fn test_encode_keeps_existing_directive() {
        let request = encode(&[Message::system("/think"), Message::user("hi")], None);
        assert_eq!(request.messages.len(), 2);
    }

    #[test]
    fn test_encode_assistant_tool_calls_and_results() {
        let reply = AssistantMessage::default().with_tool_calls(vec![
            ToolCall::new("search_web", json!({"query": "x", "max_results": 5})).with_id("c1"),
        ]);
        let request = encode(
            &[
                Message::user("q"),
                reply.into(),
                Message::tool("c1", "search_web", "[]"),
            ],
            None,
        );
        let body = serde_json::to_value(&request).unwrap();

        let assistant = &body["messages"][2];
        assert_eq!(assistant["role"], "assistant");
        assert!(assistant.get("content").is_none());
        assert_eq!(assistant["tool_calls"][0]["id"], "c1");
        assert_eq!(assistant["tool_calls"][0]["type"], "function");
        assert_eq!(assistant["tool_calls"][0]["function"]["name"], "search_web");

        let args: Value = serde_json::from_str(
            assistant["tool_calls"][0]["function"]["arguments"]
                .as_str()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(args, json!({"query": "x", "max_results": 5}));

        assert_eq!(
            body["messages"][3],
            json!({"role": "tool", "tool_call_id": "c1", "content": "[]"})
        );
    }

    #[test]
    fn test_encode_tools() {
        let tools = vec![ToolDescriptor {
            name: "scrape_page".into(),
            description: "Scrape a page".into(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let request = encode(&[Message::user("q")], Some(&tools));
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(
            body["tools"],
            json!([{
                "type": "function",
                "function": {
                    "name": "scrape_page",
                    "description": "Scrape a page",
                    "parameters": {"type": "object", "properties": {}}
                }
            }])
        );
    }

    #[test]
    fn test_extract_reasoning_strips_span() {
        let (reasoning, visible) =
            extract_reasoning("<think>\nweigh the sources\n</think>\n\nFinal answer.");
        assert_eq!(reasoning.as_deref(), Some("weigh the sources"));
        assert_eq!(visible, "Final answer.");

        let (_, visible) = extract_reasoning("Before <think>x</think>after");
        assert_eq!(visible, "Before after");
        assert!(!visible.contains("<think>"));
    }

    #[test]
    fn test_extract_reasoning_without_span_is_identity() {
        let text = "  plain text with no span  ";
        let (reasoning, visible) = extract_reasoning(text);
        assert!(reasoning.is_none());
        assert_eq!(visible, text);
    }

    #[test]
    fn test_decode_structured_tool_calls() {
        let reply = decode(response(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [
                {"id": "chatcmpl-tool-1", "type": "function",
                 "function": {"name": "search_web", "arguments": "{\"query\": \"X\"}"}},
                {"type": "function",
                 "function": {"name": "scrape_page", "arguments": "{"}},
                {"id": "", "type": "function",
                 "function": {"name": "scrape_page", "arguments": {"url": "https://a"}}}
            ]
        })))
        .unwrap();

        assert_eq!(reply.tool_calls.len(), 3);
        assert_eq!(reply.tool_calls[0].id.as_deref(), Some("chatcmpl-tool-1"));
        assert_eq!(reply.tool_calls[0].arguments.get("query"), Some(&json!("X")));
        assert!(reply.tool_calls[1].id.is_none());
        assert!(reply.tool_calls[1].arguments.is_empty());
        assert!(reply.tool_calls[2].id.is_none());
        assert_eq!(reply.tool_calls[2].arguments.get("url"), Some(&json!("https://a")));
        assert_eq!(reply.visible_text(), "");
    }

    #[test]
    fn test_decode_reasoning_sources() {
        let reply = decode(response(json!({
            "role": "assistant",
            "content": "<think>inline</think>Answer"
        })))
        .unwrap();
        assert_eq!(reply.reasoning(), Some("inline"));
        assert_eq!(reply.visible_text(), "Answer");

        let reply = decode(response(json!({
            "role": "assistant",
            "content": "Answer",
            "reasoning_content": "separate field"
        })))
        .unwrap();
        assert_eq!(reply.reasoning(), Some("separate field"));
        assert_eq!(reply.visible_text(), "Answer");
    }

    #[test]
    fn test_decode_without_choices_fails() {
        let empty: ChatCompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(decode(empty), Err(AgentError::ResponseParse(_))));
    }
}

//! Text Tool-Call Recovery
//!
//! Some providers occasionally answer with a tool call written as plain
//! text instead of a structured call:
//!
//! ```text
//! {"type": "function", "name": "search_web", "parameters": {"query": "..."}}
//! ```
//!
//! This stage runs only when the reply carries no structured tool calls and
//! can be switched off through `AgentConfig::recover_text_tool_calls`.
//! Recovery is best effort: anything that does not match yields `None`.
//!
//! Only a single embedded call is recognised. Replies containing several
//! text calls are treated as plain text.

use serde_json::Value;

use crate::tool::{ToolCall, into_arguments};

/// Try to read `content` as a single text-embedded tool call.
pub fn recover_tool_call(content: &str) -> Option<ToolCall> {
    let body = strip_code_fence(content.trim());
    if !body.starts_with('{') {
        return None;
    }

    let Value::Object(object) = serde_json::from_str::<Value>(body).ok()? else {
        return None;
    };

    if object.get("type").and_then(Value::as_str) != Some("function") {
        return None;
    }
    let name = object.get("name").and_then(Value::as_str)?;
    if name.is_empty() {
        return None;
    }

    let arguments = match object.get("parameters") {
        Some(Value::String(raw)) => serde_json::from_str(raw).map(into_arguments).unwrap_or_default(),
        Some(value) => into_arguments(value.clone()),
        None => Default::default(),
    };

    tracing::debug!(tool = %name, "Recovered tool call from reply text");
    Some(ToolCall {
        id: None,
        name: name.to_string(),
        arguments,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recovers_function_shaped_text() {
        let call = recover_tool_call(
            r#"{"type": "function", "name": "search_web", "parameters": {"query": "rust 2024"}}"#,
        )
        .unwrap();

        assert_eq!(call.name, "search_web");
        assert_eq!(call.arguments.get("query"), Some(&json!("rust 2024")));
        assert!(call.id.is_none());
    }

    #[test]
    fn test_recovers_inside_code_fence() {
        let text = "```json\n{\"type\":\"function\",\"name\":\"scrape_page\",\"parameters\":{\"url\":\"https://a.b\"}}\n```";
        let call = recover_tool_call(text).unwrap();
        assert_eq!(call.name, "scrape_page");
    }

    #[test]
    fn test_missing_parameters_become_empty_object() {
        let call = recover_tool_call(r#"{"type":"function","name":"search_web"}"#).unwrap();
        assert!(call.arguments.is_empty());

        let call =
            recover_tool_call(r#"{"type":"function","name":"search_web","parameters":"{"}"#)
                .unwrap();
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn test_stringified_parameters() {
        let call = recover_tool_call(
            r#"{"type":"function","name":"search_web","parameters":"{\"query\":\"x\"}"}"#,
        )
        .unwrap();
        assert_eq!(call.arguments.get("query"), Some(&json!("x")));
    }

    #[test]
    fn test_rejects_non_matching_text() {
        assert!(recover_tool_call("The answer is 42.").is_none());
        assert!(recover_tool_call("{").is_none());
        assert!(recover_tool_call(r#"{"type": "function", "name": "#).is_none());
        assert!(recover_tool_call(r#"{"type": "text", "name": "search_web"}"#).is_none());
        assert!(recover_tool_call(r#"{"type": "function", "parameters": {}}"#).is_none());
        assert!(recover_tool_call(r#"[{"type": "function", "name": "a"}]"#).is_none());
    }
}

//! Scripted collaborators for unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{AgentError, Result};
use crate::event::AgentEvent;
use crate::message::{AssistantMessage, Message};
use crate::provider::LlmProvider;
use crate::tool::{
    RawTool, ToolArguments, ToolDescriptor, ToolOutput, ToolSession, ToolSessionFactory,
};

/// Provider replaying a fixed script of replies
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<AssistantMessage>>>,
    fallback: Option<AssistantMessage>,
    calls: Mutex<Vec<(Vec<Message>, bool)>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<AssistantMessage>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reply used once the script runs out
    pub fn with_fallback(mut self, reply: AssistantMessage) -> Self {
        self.fallback = Some(reply);
        self
    }

    pub fn invocations(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Whether tools were bound, per invocation
    pub fn tools_bound(&self) -> Vec<bool> {
        self.calls.lock().unwrap().iter().map(|(_, b)| *b).collect()
    }

    /// Conversation the provider saw on its `n`th invocation
    pub fn seen_messages(&self, n: usize) -> Vec<Message> {
        self.calls.lock().unwrap()[n].0.clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDescriptor]>,
    ) -> Result<AssistantMessage> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), tools.is_some()));

        let next = self.replies.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(reply), _) => reply,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(AgentError::Provider("script exhausted".into())),
        }
    }
}

/// Tool session answering from per-tool queues
pub struct ScriptedSession {
    tools: Vec<RawTool>,
    replies: HashMap<String, VecDeque<Result<ToolOutput>>>,
    default_reply: Option<ToolOutput>,
    calls: Arc<Mutex<Vec<(String, ToolArguments)>>>,
    closed: Arc<AtomicBool>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self {
            tools: default_tools(),
            replies: HashMap::new(),
            default_reply: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue a reply for the next call of `tool`
    pub fn reply(mut self, tool: &str, reply: Result<ToolOutput>) -> Self {
        self.replies
            .entry(tool.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn default_reply(mut self, reply: ToolOutput) -> Self {
        self.default_reply = Some(reply);
        self
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    pub fn call_log(&self) -> Arc<Mutex<Vec<(String, ToolArguments)>>> {
        Arc::clone(&self.calls)
    }
}

fn default_tools() -> Vec<RawTool> {
    vec![
        RawTool {
            name: "search_web".into(),
            description: Some("Search the web".into()),
            input_schema: json!({
                "type": "object",
                "properties": {"query": {"type": "string"}, "max_results": {"type": "integer"}},
                "required": ["query"]
            }),
        },
        RawTool {
            name: "scrape_page".into(),
            description: None,
            input_schema: json!({
                "type": "object",
                "properties": {"url": {"type": "string"}},
                "required": ["url"]
            }),
        },
    ]
}

#[async_trait]
impl ToolSession for ScriptedSession {
    async fn list_tools(&mut self) -> Result<Vec<RawTool>> {
        Ok(self.tools.clone())
    }

    async fn call_tool(&mut self, name: &str, arguments: &ToolArguments) -> Result<ToolOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));

        if let Some(reply) = self.replies.get_mut(name).and_then(VecDeque::pop_front) {
            return reply;
        }
        self.default_reply
            .clone()
            .ok_or_else(|| AgentError::ToolSession(format!("Unknown tool: {name}")))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory handing out one prepared session, or failing to start
pub struct ScriptedFactory {
    session: Mutex<Option<ScriptedSession>>,
}

impl ScriptedFactory {
    pub fn new(session: ScriptedSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    pub fn failing() -> Self {
        Self {
            session: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ToolSessionFactory for ScriptedFactory {
    async fn open(&self) -> Result<Box<dyn ToolSession>> {
        let session = self.session.lock().unwrap().take();
        match session {
            Some(session) => Ok(Box::new(session)),
            None => Err(AgentError::startup(
                "spawn `tool-server`",
                std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            )),
        }
    }

    fn describe(&self) -> String {
        "scripted".into()
    }
}

pub async fn collect_events(rx: mpsc::Receiver<AgentEvent>) -> Vec<AgentEvent> {
    ReceiverStream::new(rx).collect().await
}

pub fn kinds(events: &[AgentEvent]) -> Vec<&'static str> {
    events.iter().map(AgentEvent::kind).collect()
}

//! Agent Loop
//!
//! Iterative tool-calling loop. Each round invokes the model with the tool
//! catalog bound; a reply without tool calls is the final answer, a reply
//! with tool calls runs them in order and feeds the results back.
//!
//! ```text
//! Initializing ──► Iterating ──► Answering ──► Done
//!                     │
//!                     └────────► Exhausted ──► Done
//! ```
//!
//! `max_iterations` bounds the total number of model invocations. When the
//! budget runs out without an answer, the last invocation is made with
//! tools disabled and its text becomes the answer.

use crate::error::Result;
use crate::event::{AgentEvent, EventSink, links_from_search_results};
use crate::message::{AssistantMessage, Conversation, Message};
use crate::provider::LlmProvider;
use crate::recovery::recover_tool_call;
use crate::tool::{ToolCall, ToolDescriptor, ToolInvoker};

pub const STATUS_STARTING: &str = "Initiating deep research...";
pub const STATUS_ANALYZING: &str = "Analyzing context...";
pub const STATUS_ANSWERING: &str = "Formulating final answer...";
pub const STATUS_EXHAUSTED: &str = "Max research depth reached.";

/// Default bound on model invocations per research call
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Tool whose JSON-array results are surfaced as links
pub const DEFAULT_SEARCH_TOOL: &str = "search_web";

const DEFAULT_SYSTEM_PROMPT: &str = r"You are a Deep Research Agent and an expert analyst. Research the user's query in depth by searching the web and reading the relevant pages before you answer.

Rules for the final answer:
1. Output only the final, polished answer. Never include internal thoughts, drafting notes such as 'Let me write the answer', or commentary about your own process.
2. Never output raw tool URLs (for example reader or proxy wrappers around a page) or raw JSON in the answer. Cite sources as clean Markdown links like [Article Title](https://original-site.example/article), with any proxy prefix removed.
3. Always end the answer with every source you used, as a bulleted list under a '### Sources' heading.
4. You are explicitly authorized to provide forecasts and speculative analysis of future events based on aggregated data, polling and news. Do not refuse on the grounds that the question asks for speculation.

Use the provided tools iteratively to gather what you need.";

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt seeded at the start of every call
    pub system_prompt: String,

    /// Maximum model invocations, including the final tools-disabled one.
    /// Values below 1 are treated as 1: every call invokes the model once.
    pub max_iterations: usize,

    /// Tool whose JSON-array result produces a `links_found` event
    pub search_tool: String,

    /// Read `{"type":"function",...}` reply text as a tool call
    pub recover_text_tool_calls: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            search_tool: DEFAULT_SEARCH_TOOL.into(),
            recover_text_tool_calls: true,
        }
    }
}

impl AgentConfig {
    /// Model invocations allowed per research call, never zero
    pub fn invocation_budget(&self) -> usize {
        self.max_iterations.max(1)
    }

    /// Rounds that may run with tools bound; the remaining invocation is
    /// reserved for the exhaustion answer.
    pub fn tool_rounds(&self) -> usize {
        self.invocation_budget() - 1
    }
}

/// Loop phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Iterating,
    Answering,
    Exhausted,
    Done,
}

/// Loop-local state. Created per research call, never shared.
#[derive(Clone, Debug)]
pub struct AgentState {
    pub conversation: Conversation,
    pub iteration: usize,
    pub phase: Phase,
}

impl AgentState {
    pub fn new(system_prompt: &str, query: &str) -> Self {
        let mut conversation = Conversation::with_system_prompt(system_prompt);
        conversation.push(Message::user(query));
        Self {
            conversation,
            iteration: 0,
            phase: Phase::Initializing,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Done
    }
}

/// One research call's loop
pub struct AgentLoop<'a> {
    provider: &'a dyn LlmProvider,
    config: &'a AgentConfig,
    invoker: &'a mut ToolInvoker,
    events: &'a EventSink,
}

impl<'a> AgentLoop<'a> {
    pub fn new(
        provider: &'a dyn LlmProvider,
        config: &'a AgentConfig,
        invoker: &'a mut ToolInvoker,
        events: &'a EventSink,
    ) -> Self {
        Self {
            provider,
            config,
            invoker,
            events,
        }
    }

    /// Run the loop to its terminal answer and return the final state.
    pub async fn run(mut self, query: &str) -> Result<AgentState> {
        let mut state = AgentState::new(&self.config.system_prompt, query);
        self.events.emit(AgentEvent::status(STATUS_STARTING)).await?;

        let catalog = self.invoker.catalog().await?;
        tracing::info!(tools = ?catalog.names(), "Tool catalog ready");
        state.phase = Phase::Iterating;

        while state.iteration < self.config.tool_rounds() {
            state.iteration += 1;
            self.events.emit(AgentEvent::status(STATUS_ANALYZING)).await?;

            let reply = self.invoke_model(&state, Some(catalog.descriptors())).await?;
            let reply = self.prepare_reply(reply, state.iteration);
            let calls = reply.tool_calls.clone();
            let reasoning = reply.reasoning().map(str::to_string);
            let content = reply.visible_text().to_string();
            state.conversation.push(reply);

            if let Some(content) = reasoning {
                self.events.emit(AgentEvent::Reasoning { content }).await?;
            }

            if calls.is_empty() {
                state.phase = Phase::Answering;
                self.events.emit(AgentEvent::status(STATUS_ANSWERING)).await?;
                self.events.emit(AgentEvent::answer(content)).await?;
                state.phase = Phase::Done;
                return Ok(state);
            }

            for call in calls {
                self.run_tool(&mut state, call).await?;
            }
        }

        tracing::info!(iterations = state.iteration, "Iteration budget exhausted");
        state.phase = Phase::Exhausted;
        self.events.emit(AgentEvent::status(STATUS_EXHAUSTED)).await?;

        state.iteration += 1;
        let reply = self.invoke_model(&state, None).await?;
        let content = reply.visible_text().to_string();
        state.conversation.push(reply);
        self.events.emit(AgentEvent::answer(content)).await?;

        state.phase = Phase::Done;
        Ok(state)
    }

    async fn invoke_model(
        &self,
        state: &AgentState,
        tools: Option<&[ToolDescriptor]>,
    ) -> Result<AssistantMessage> {
        let unanswered = state.conversation.unanswered_tool_calls();
        if !unanswered.is_empty() {
            tracing::warn!(?unanswered, "Invoking model with unanswered tool calls");
        }

        tracing::debug!(
            iteration = state.iteration,
            messages = state.conversation.len(),
            tools_bound = tools.is_some(),
            "Invoking model"
        );
        self.provider
            .complete(state.conversation.messages(), tools)
            .await
    }

    /// Apply text recovery and give every tool call an id.
    fn prepare_reply(&self, mut reply: AssistantMessage, iteration: usize) -> AssistantMessage {
        if !reply.has_tool_calls() && self.config.recover_text_tool_calls {
            if let Some(call) = recover_tool_call(reply.visible_text()) {
                reply.content = None;
                reply.tool_calls = vec![call];
            }
        }

        for (index, call) in reply.tool_calls.iter_mut().enumerate() {
            call.ensure_id(iteration, index);
        }
        reply
    }

    async fn run_tool(&mut self, state: &mut AgentState, call: ToolCall) -> Result<()> {
        self.events
            .emit(AgentEvent::ToolCall {
                tool: call.name.clone(),
                args: call.arguments.clone(),
            })
            .await?;

        let message = match self.invoker.invoke(&call.name, &call.arguments).await {
            Ok(text) => {
                if call.name == self.config.search_tool {
                    if let Some(links) = links_from_search_results(&text) {
                        self.events.emit(AgentEvent::LinksFound { links }).await?;
                    }
                }
                Message::tool(call.call_id(), &call.name, text)
            }
            Err(err) => Message::tool_error(call.call_id(), &err),
        };

        state.conversation.push(message);
        Ok(())
    }
}

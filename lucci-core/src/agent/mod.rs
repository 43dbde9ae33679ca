//! Bounded multi-step control loop
//!
//! An [`Agent`] runs one chat turn at a time: it renders the system prompt
//! from the user's context, asks the completion engine what to do, runs any
//! requested tools through the [`ToolMap`], feeds the results back, and stops
//! on final text or when the step budget is spent.
//!
//! # Example
//!
//! ```rust,no_run
//! use lucci_core::agent::Agent;
//! use lucci_core::conversation::Message;
//!
//! # async fn example() -> lucci_core::error::Result<()> {
//! let agent = Agent::builder().with_default_capabilities().build()?;
//! let output = agent
//!     .chat(vec![Message::user("What is my balance?")], Some("0xabc123def"))
//!     .await?;
//! println!("{}", output.text);
//! # Ok(())
//! # }
//! ```

mod events;
mod prompt;
mod stream;

pub use events::AgentEvent;
pub use prompt::{CONTEXT_PLACEHOLDER, LUCCI_SYSTEM_PROMPT, system_prompt};
pub use stream::AgentEventStream;

use events::EventSink;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::actions::{Swap, Transfer};
use crate::config::{AgentConfig, LucciConfig};
use crate::context::{ContextProvider, NO_CONTEXT};
use crate::conversation::{ConversationHistory, Message, ToolInvocation};
use crate::error::{LucciError, Result};
use crate::llm::{
    Completion, CompletionChunk, CompletionRequest, LLMProvider, LLMProviderFactory, RetryConfig,
    ToolCall, ToolDefinition, with_retry,
};
use crate::tools::{ActionResult, Capability, ToolError, ToolMap, ToolRegistry};

/// Reply when the engine asks for a tool that does not exist
pub const TOOL_FAILURE_REPLY: &str =
    "I encountered an error while trying to process your request.";

const AWAITING_CONFIRMATION: &str = "awaiting user confirmation";
const SKIPPED_AFTER_FAILURE: &str = "not executed: an earlier call in this batch failed";
const SKIPPED_AFTER_CANCEL: &str = "not executed: the turn was cancelled";

/// Why a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The engine produced a final answer
    Completed,
    /// The engine was still requesting tools when the step budget ran out
    StepBudgetExhausted,
    /// The engine requested a tool that is not registered
    ToolFailure,
    /// The caller went away mid-turn
    Cancelled,
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FinishReason::Completed => "completed",
            FinishReason::StepBudgetExhausted => "step_budget_exhausted",
            FinishReason::ToolFailure => "tool_failure",
            FinishReason::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Result of a chat turn
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutput {
    /// Final text, or the best partial text if the turn did not complete
    pub text: String,
    /// Every tool call made during the turn, with its result
    pub tool_invocations: Vec<ToolInvocation>,
    /// Number of completion engine calls
    pub steps: usize,
    pub finish_reason: FinishReason,
    pub incomplete: bool,
    /// Transcript after the turn, without the system prompt
    #[serde(skip)]
    pub messages: Vec<Message>,
}

/// Bookkeeping for one turn
#[derive(Debug, Default)]
struct TurnState {
    steps: usize,
    last_text: String,
    invocations: Vec<ToolInvocation>,
    awaiting_confirmation: bool,
}

impl TurnState {
    fn note_text(&mut self, text: Option<&str>) {
        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            self.last_text = text.to_string();
        }
    }

    fn finish(self, reason: FinishReason, history: ConversationHistory) -> ChatOutput {
        ChatOutput {
            text: self.last_text,
            tool_invocations: self.invocations,
            steps: self.steps,
            finish_reason: reason,
            incomplete: reason != FinishReason::Completed,
            messages: history.into_messages(),
        }
    }
}

/// Outcome of running one batch of tool calls.
///
/// Both variants carry one result per requested call, in request order.
enum Batch {
    Done(Vec<ToolInvocation>),
    Stop(FinishReason, Vec<ToolInvocation>),
}

/// Conversational DeFi agent
#[derive(Clone)]
pub struct Agent {
    provider: Arc<dyn LLMProvider>,
    context: Arc<ContextProvider>,
    tools: ToolMap,
    config: AgentConfig,
    retry: RetryConfig,
    temperature: Option<f32>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("provider", &self.provider.model_info())
            .field("tools", &self.tools.names())
            .field("config", &self.config)
            .finish()
    }
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Build an agent with the built-in tools, swap and transfer
    pub fn from_config(config: LucciConfig) -> Result<Self> {
        AgentBuilder::new()
            .config(config)
            .with_default_capabilities()
            .build()
    }

    pub fn tools(&self) -> &ToolMap {
        &self.tools
    }

    pub fn context(&self) -> &Arc<ContextProvider> {
        &self.context
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn max_steps(&self) -> usize {
        self.config.max_steps
    }

    /// Tool definitions advertised to the engine
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }

    /// Run one turn to completion.
    ///
    /// Only completion engine failures surface as `Err`; everything else ends
    /// up in the [`ChatOutput`].
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        user_address: Option<&str>,
    ) -> Result<ChatOutput> {
        self.run_turn(messages, user_address, &EventSink::silent())
            .await
    }

    /// Render the system prompt for a user
    pub async fn render_system_prompt(&self, user_address: Option<&str>) -> String {
        let address = user_address.or(self.config.user_address.as_deref());
        let context = match address {
            Some(address) => self.context.describe_for_prompt(Some(address)).await,
            None => NO_CONTEXT.to_string(),
        };
        let template = self
            .config
            .system_prompt
            .as_deref()
            .unwrap_or(LUCCI_SYSTEM_PROMPT);
        system_prompt(template, &context)
    }

    pub(crate) async fn run_turn(
        &self,
        messages: Vec<Message>,
        user_address: Option<&str>,
        sink: &EventSink,
    ) -> Result<ChatOutput> {
        let system = self.render_system_prompt(user_address).await;
        let definitions = self.tools.definitions();
        let mut history = ConversationHistory::from_messages(messages);
        let mut state = TurnState::default();

        tracing::info!(
            messages = history.len(),
            max_steps = self.config.max_steps,
            "Starting chat turn"
        );

        loop {
            if sink.is_cancelled() {
                return Ok(self.finish(state, FinishReason::Cancelled, history));
            }
            if state.steps >= self.config.max_steps {
                return Ok(self.finish(state, FinishReason::StepBudgetExhausted, history));
            }
            state.steps += 1;

            let request = CompletionRequest::new(system.clone(), history.messages().to_vec())
                .with_tools(definitions.clone())
                .with_temperature(self.temperature);

            let completion = tokio::select! {
                biased;
                _ = sink.cancelled() => {
                    return Ok(self.finish(state, FinishReason::Cancelled, history));
                }
                completion = self.dispatch(&request, sink) => completion?,
            };

            match completion {
                Completion::Text(text) => {
                    tracing::debug!(step = state.steps, "Engine returned final text");
                    state.note_text(Some(&text));
                    history.add_assistant_message(text);
                    return Ok(self.finish(state, FinishReason::Completed, history));
                }
                Completion::ToolCalls { text, calls } => {
                    state.note_text(text.as_deref());
                    let requested = calls
                        .iter()
                        .map(|c| ToolInvocation::new(&c.id, &c.name, c.arguments.clone()))
                        .collect();
                    history.add_tool_calls(text.as_deref(), requested);

                    match self.run_tools(calls, &mut state, sink).await {
                        Batch::Done(results) => history.add_tool_results(results),
                        Batch::Stop(reason, results) => {
                            history.add_tool_results(results);
                            if reason == FinishReason::ToolFailure {
                                state.last_text = TOOL_FAILURE_REPLY.to_string();
                            }
                            return Ok(self.finish(state, reason, history));
                        }
                    }
                }
            }
        }
    }

    fn finish(
        &self,
        state: TurnState,
        reason: FinishReason,
        history: ConversationHistory,
    ) -> ChatOutput {
        tracing::info!(
            steps = state.steps,
            tool_calls = state.invocations.len(),
            finish_reason = %reason,
            "Chat turn finished"
        );
        state.finish(reason, history)
    }

    /// Ask the engine for the next step, retrying transient failures
    async fn dispatch(&self, request: &CompletionRequest, sink: &EventSink) -> Result<Completion> {
        if !sink.is_streaming() {
            return with_retry(
                &self.retry,
                || self.provider.complete(request),
                LucciError::is_retryable,
            )
            .await;
        }

        let mut stream = with_retry(
            &self.retry,
            || self.provider.complete_stream(request),
            LucciError::is_retryable,
        )
        .await?;

        while let Some(chunk) = stream.next().await {
            match chunk? {
                CompletionChunk::TextDelta(text) => {
                    sink.emit(AgentEvent::TextDelta { text }).await;
                }
                CompletionChunk::Completed(completion) => return Ok(completion),
            }
        }

        Err(LucciError::llm("completion stream ended without a result"))
    }

    /// Run a batch of tool calls in request order
    async fn run_tools(
        &self,
        calls: Vec<ToolCall>,
        state: &mut TurnState,
        sink: &EventSink,
    ) -> Batch {
        let mut results = Vec::with_capacity(calls.len());
        let mut pending = calls.into_iter();

        while let Some(call) = pending.next() {
            if sink.is_cancelled() {
                skip_remaining(
                    &mut results,
                    Some(call).into_iter().chain(pending),
                    SKIPPED_AFTER_CANCEL,
                );
                return Batch::Stop(FinishReason::Cancelled, results);
            }

            sink.emit(AgentEvent::ToolCall {
                tool_call_id: call.id.clone(),
                tool_name: call.name.clone(),
                args: call.arguments.clone(),
            })
            .await;

            let (result, unknown_tool) = match self.execute_call(&call, state).await {
                Ok(result) => (result, false),
                Err(e) => {
                    tracing::warn!(step = state.steps, tool = %call.name, error = %e, "Ending turn");
                    (e.to_action_result(&call.name), true)
                }
            };

            if sink.is_cancelled() {
                tracing::debug!(tool = %call.name, "Discarding tool result after cancellation");
                skip_remaining(
                    &mut results,
                    Some(call).into_iter().chain(pending),
                    SKIPPED_AFTER_CANCEL,
                );
                return Batch::Stop(FinishReason::Cancelled, results);
            }

            sink.emit(AgentEvent::ToolResult {
                tool_call_id: call.id.clone(),
                tool_name: call.name.clone(),
                result: result.clone(),
            })
            .await;

            let invocation = ToolInvocation::new(call.id, call.name, call.arguments)
                .with_result(serde_json::to_value(&result).unwrap_or_default());
            state.invocations.push(invocation.clone());
            results.push(invocation);

            if unknown_tool {
                skip_remaining(&mut results, pending, SKIPPED_AFTER_FAILURE);
                return Batch::Stop(FinishReason::ToolFailure, results);
            }
        }

        Batch::Done(results)
    }

    /// Execute one call. Only an unknown tool is an `Err`.
    async fn execute_call(
        &self,
        call: &ToolCall,
        state: &mut TurnState,
    ) -> std::result::Result<ActionResult, ToolError> {
        let entry = self.tools.get(&call.name).ok_or_else(|| ToolError::NotFound {
            name: call.name.clone(),
        })?;
        let mutating = entry.is_mutating();

        if mutating && state.awaiting_confirmation {
            tracing::info!(
                step = state.steps,
                tool = %call.name,
                "Skipping mutating call while a transaction awaits confirmation"
            );
            return Ok(ActionResult::error(&call.name, AWAITING_CONFIRMATION));
        }

        let result = match self.tools.invoke_traced(&call.name, &call.arguments).await {
            Ok((result, provenance)) => {
                tracing::debug!(
                    step = state.steps,
                    tool = %provenance.tool_name,
                    args_hash = %provenance.args_hash,
                    "Tool call recorded"
                );
                result
            }
            Err(ToolError::NotFound { name }) => return Err(ToolError::NotFound { name }),
            Err(e) => {
                tracing::info!(step = state.steps, tool = %call.name, code = e.code(), "Tool call rejected");
                e.to_action_result(&call.name)
            }
        };

        if mutating && result.requires_user_confirmation() {
            state.awaiting_confirmation = true;
        }

        Ok(result)
    }
}

/// Answer calls that will not run so every request keeps a matching result
fn skip_remaining(
    results: &mut Vec<ToolInvocation>,
    calls: impl IntoIterator<Item = ToolCall>,
    reason: &str,
) {
    results.extend(calls.into_iter().map(|call| {
        let result = ActionResult::error(&call.name, reason);
        ToolInvocation::new(call.id, call.name, call.arguments)
            .with_result(serde_json::to_value(&result).unwrap_or_default())
    }));
}

/// Wires an [`Agent`] together
#[derive(Default)]
pub struct AgentBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    context: Option<Arc<ContextProvider>>,
    registry: Option<ToolRegistry>,
    config: LucciConfig,
    capabilities: Vec<Arc<dyn Capability>>,
    default_capabilities: bool,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completion engine. Defaults to the one named in the config.
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Context provider. Defaults to the mock data sources.
    pub fn context(mut self, context: Arc<ContextProvider>) -> Self {
        self.context = Some(context);
        self
    }

    /// Start from an existing registry instead of a fresh one
    pub fn registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: LucciConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.config.agent.max_steps = max_steps;
        self
    }

    /// Register an additional capability
    pub fn capability(mut self, capability: Arc<dyn Capability>) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Register `swap` and `transfer` using the configured routing and chains
    pub fn with_default_capabilities(mut self) -> Self {
        self.default_capabilities = true;
        self
    }

    pub fn build(self) -> Result<Agent> {
        self.config.validate()?;

        let context = self
            .context
            .unwrap_or_else(|| Arc::new(ContextProvider::mock()));
        let provider = match self.provider {
            Some(provider) => provider,
            None => LLMProviderFactory::create(&self.config.llm)?,
        };

        let mut registry = self.registry.unwrap_or_else(|| {
            ToolRegistry::new(context.clone())
                .with_runtime_config(self.config.tools.runtime.clone())
        });

        if self.default_capabilities {
            registry.register(Arc::new(Swap::new(
                self.config.tools.routing.clone(),
                context.clone(),
            )))?;
            registry.register(Arc::new(Transfer::new(
                self.config.tools.transfer_chains.clone(),
            )))?;
        }
        registry.register_all(self.capabilities)?;

        let tools = registry.build_tool_map();
        tracing::info!(
            tools = ?tools.names(),
            provider = %provider.model_info().provider,
            "Agent ready"
        );

        Ok(Agent {
            provider,
            context,
            tools,
            config: self.config.agent,
            retry: self.config.llm.retry,
            temperature: self.config.llm.temperature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedProvider;
    use serde_json::json;

    fn agent_with(provider: Arc<ScriptedProvider>) -> Agent {
        Agent::builder()
            .provider(provider)
            .with_default_capabilities()
            .build()
            .unwrap()
    }

    fn swap_call(id: &str) -> ToolCall {
        ToolCall::new(
            id,
            "swap",
            json!({"tokenIn": "SOL", "tokenOut": "USDC", "amount": 1}),
        )
    }

    #[tokio::test]
    async fn test_text_completes_in_one_step() {
        let provider = Arc::new(ScriptedProvider::new(vec![Completion::text("gm")]));
        let output = agent_with(provider)
            .chat(vec![Message::user("gm")], None)
            .await
            .unwrap();

        assert_eq!(output.text, "gm");
        assert_eq!(output.steps, 1);
        assert_eq!(output.finish_reason, FinishReason::Completed);
        assert!(!output.incomplete);
    }

    #[tokio::test]
    async fn test_unknown_tool_ends_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![Completion::tool_call(
            ToolCall::new("c1", "bridge", json!({})),
        )]));
        let output = agent_with(provider.clone())
            .chat(vec![Message::user("bridge it")], None)
            .await
            .unwrap();

        assert_eq!(output.finish_reason, FinishReason::ToolFailure);
        assert_eq!(output.text, TOOL_FAILURE_REPLY);
        assert_eq!(provider.call_count().await, 1);

        let result = output.tool_invocations[0].result.as_ref().unwrap();
        assert_eq!(result["status"], "error");
        assert_eq!(result["details"]["code"], "TOOL_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_second_mutating_call_blocked() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Completion::ToolCalls {
                text: None,
                calls: vec![swap_call("c1"), swap_call("c2")],
            },
            Completion::text("Please sign."),
        ]));
        let output = agent_with(provider)
            .chat(vec![Message::user("swap twice")], None)
            .await
            .unwrap();

        let statuses: Vec<_> = output
            .tool_invocations
            .iter()
            .map(|i| i.result.as_ref().unwrap()["status"].clone())
            .collect();
        assert_eq!(statuses, vec![json!("requires_confirmation"), json!("error")]);
        assert_eq!(
            output.tool_invocations[1].result.as_ref().unwrap()["details"]["reason"],
            AWAITING_CONFIRMATION
        );
    }

    #[tokio::test]
    async fn test_invalid_arguments_fed_back() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Completion::tool_call(ToolCall::new("c1", "swap", json!({"amount": -1}))),
            Completion::text("Which tokens?"),
        ]));
        let output = agent_with(provider.clone())
            .chat(vec![Message::user("swap")], None)
            .await
            .unwrap();

        assert_eq!(output.finish_reason, FinishReason::Completed);
        let result = output.tool_invocations[0].result.as_ref().unwrap();
        assert_eq!(result["details"]["code"], "INVALID_ARGUMENTS");
        assert_eq!(result["details"]["violations"].as_array().unwrap().len(), 3);

        let second = &provider.requests().await[1];
        assert!(second.messages.iter().any(|m| m.role == crate::conversation::MessageRole::Tool));
    }

    #[tokio::test]
    async fn test_engine_failure_is_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let result = agent_with(provider).chat(vec![Message::user("gm")], None).await;
        assert!(matches!(result, Err(LucciError::Llm { .. })));
    }

    #[test]
    fn test_builder_rejects_zero_budget() {
        let result = Agent::builder()
            .provider(Arc::new(ScriptedProvider::new(vec![])))
            .max_steps(0)
            .build();
        assert!(matches!(result, Err(LucciError::Configuration(_))));
    }

    #[test]
    fn test_default_capabilities_registered() {
        let agent = agent_with(Arc::new(ScriptedProvider::new(vec![])));
        assert_eq!(
            agent.tools().names(),
            vec!["get_portfolio", "search_knowledge", "swap", "transfer"]
        );
    }
}

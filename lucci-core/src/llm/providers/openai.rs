//! OpenAI chat-completions provider with function calling

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;

use crate::conversation::{Message, MessageRole};
use crate::error::{LucciError, Result};
use crate::llm::{
    Completion, CompletionChunk, CompletionRequest, CompletionStream, LLMProvider, ModelInfo,
    ToolCall,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI LLM provider (GPT-4o and compatible endpoints).
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    request_timeout: Option<Duration>,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenAI API key
    /// * `model` - Model name (e.g., "gpt-4o", "gpt-4o-mini")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    /// Create with a custom base URL (for Azure OpenAI or compatible APIs).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout: None,
        }
    }

    /// Create from environment variables.
    ///
    /// Reads from:
    /// - `OPENAI_API_KEY` - API key (required)
    /// - `OPENAI_MODEL` - Model name (optional, defaults to "gpt-4o")
    /// - `OPENAI_BASE_URL` - Custom base URL (optional)
    ///
    /// # Errors
    ///
    /// Returns an error if OPENAI_API_KEY is not set.
    pub fn from_env(model: Option<impl Into<String>>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            LucciError::Configuration("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let model = model
            .map(|m| m.into())
            .or_else(|| std::env::var("OPENAI_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self::with_base_url(api_key, model, base_url))
    }

    /// Bound every request to this duration
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: &CompletionRequest, stream: bool) -> Result<reqwest::Response> {
        let body = ChatRequest {
            model: &self.model,
            messages: convert_messages(&request.system, &request.messages),
            tools: request
                .tools
                .iter()
                .map(|t| ChatTool {
                    kind: "function",
                    function: ChatFunction {
                        name: &t.name,
                        description: &t.description,
                        parameters: &t.parameters,
                    },
                })
                .collect(),
            temperature: request.temperature,
            stream,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body);
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            LucciError::llm_transient(format!("Failed to send request to OpenAI: {}", e))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = match serde_json::from_str::<OpenAIError>(&text) {
            Ok(error) => format!(
                "OpenAI API error ({}): {}",
                error.error.error_type.unwrap_or_else(|| status.to_string()),
                error.error.message
            ),
            Err(_) => format!("OpenAI API error ({}): {}", status, text),
        };

        if status.as_u16() == 429 || status.is_server_error() {
            Err(LucciError::llm_transient(message))
        } else {
            Err(LucciError::llm(message))
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct ChatTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatFunction<'a>,
}

#[derive(Serialize)]
struct ChatFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &'static str, content: String) -> Self {
        Self {
            role,
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: ChatFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    /// JSON-encoded arguments
    arguments: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChatToolCall>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallDelta>,
}

#[derive(Deserialize)]
struct ToolCallDelta {
    index: usize,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIError {
    error: OpenAIErrorDetail,
}

#[derive(Deserialize)]
struct OpenAIErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

fn convert_messages(system: &str, messages: &[Message]) -> Vec<ChatMessage> {
    let mut converted = vec![ChatMessage::text("system", system.to_string())];

    for message in messages {
        match message.role {
            MessageRole::System => converted.push(ChatMessage::text("system", message.text_content())),
            MessageRole::User => converted.push(ChatMessage::text("user", message.text_content())),
            MessageRole::Assistant => {
                let calls: Vec<ChatToolCall> = message
                    .tool_invocations()
                    .map(|inv| ChatToolCall {
                        id: inv.tool_call_id.clone(),
                        kind: function_kind(),
                        function: ChatFunctionCall {
                            name: inv.tool_name.clone(),
                            arguments: inv.args.to_string(),
                        },
                    })
                    .collect();
                let text = message.text_content();

                if calls.is_empty() {
                    converted.push(ChatMessage::text("assistant", text));
                } else {
                    converted.push(ChatMessage {
                        role: "assistant",
                        content: (!text.is_empty()).then_some(text),
                        tool_calls: Some(calls),
                        tool_call_id: None,
                    });
                }
            }
            MessageRole::Tool => {
                for inv in message.tool_invocations() {
                    converted.push(ChatMessage {
                        role: "tool",
                        content: Some(
                            inv.result
                                .as_ref()
                                .map(Value::to_string)
                                .unwrap_or_else(|| "null".to_string()),
                        ),
                        tool_calls: None,
                        tool_call_id: Some(inv.tool_call_id.clone()),
                    });
                }
            }
        }
    }

    converted
}

/// Malformed argument JSON is passed through as a string so argument
/// validation can report it back to the model.
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn into_completion(content: Option<String>, calls: Vec<ChatToolCall>) -> Completion {
    if calls.is_empty() {
        return Completion::Text(content.unwrap_or_default());
    }

    Completion::ToolCalls {
        text: content.filter(|c| !c.is_empty()),
        calls: calls
            .into_iter()
            .map(|c| ToolCall::new(c.id, c.function.name, parse_arguments(&c.function.arguments)))
            .collect(),
    }
}

#[derive(Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Rebuilds a completion from streamed deltas
#[derive(Default)]
struct StreamAccumulator {
    text: String,
    calls: Vec<PartialCall>,
}

impl StreamAccumulator {
    /// Apply a chunk, returning any new text.
    ///
    /// Tool call indices must grow by at most one per new call.
    fn apply(&mut self, chunk: StreamChunk) -> Result<Option<String>> {
        let mut text = String::new();

        for choice in chunk.choices {
            if let Some(content) = choice.delta.content {
                text.push_str(&content);
            }
            for delta in choice.delta.tool_calls {
                if delta.index > self.calls.len() {
                    return Err(LucciError::llm(format!(
                        "stream tool call index {} skips ahead of {} known calls",
                        delta.index,
                        self.calls.len()
                    )));
                }
                if delta.index == self.calls.len() {
                    self.calls.push(PartialCall::default());
                }
                let call = &mut self.calls[delta.index];
                if let Some(id) = delta.id {
                    call.id = id;
                }
                if let Some(function) = delta.function {
                    if let Some(name) = function.name {
                        call.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        call.arguments.push_str(&arguments);
                    }
                }
            }
        }

        if text.is_empty() {
            Ok(None)
        } else {
            self.text.push_str(&text);
            Ok(Some(text))
        }
    }

    fn finish(&mut self) -> Completion {
        let text = std::mem::take(&mut self.text);
        let calls = std::mem::take(&mut self.calls)
            .into_iter()
            .filter(|c| !c.name.is_empty())
            .map(|c| ChatToolCall {
                id: c.id,
                kind: function_kind(),
                function: ChatFunctionCall {
                    name: c.name,
                    arguments: c.arguments,
                },
            })
            .collect();
        into_completion(Some(text), calls)
    }
}

struct StreamState {
    lines: std::pin::Pin<Box<dyn futures::Stream<Item = std::io::Result<String>> + Send>>,
    accumulator: StreamAccumulator,
    finished: bool,
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let response = self.send(request, false).await?;

        let mut parsed: ChatResponse = response.json().await.map_err(|e| {
            LucciError::llm(format!("Failed to parse OpenAI response: {}", e))
        })?;

        if parsed.choices.is_empty() {
            return Err(LucciError::llm("OpenAI API returned no choices"));
        }

        let message = parsed.choices.remove(0).message;
        Ok(into_completion(message.content, message.tool_calls))
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<CompletionStream> {
        let response = self.send(request, true).await?;

        let bytes_stream = response.bytes_stream();
        let reader = tokio_util::io::StreamReader::new(
            bytes_stream.map(|r| r.map_err(std::io::Error::other)),
        );
        let lines = LinesStream::new(tokio::io::BufReader::new(reader).lines());

        let state = StreamState {
            lines: Box::pin(lines),
            accumulator: StreamAccumulator::default(),
            finished: false,
        };

        let stream = futures::stream::unfold(state, |mut state| async move {
            if state.finished {
                return None;
            }

            loop {
                match state.lines.next().await {
                    Some(Ok(line)) => {
                        let Some(data) = line.strip_prefix("data:").map(str::trim) else {
                            continue;
                        };
                        if data == "[DONE]" {
                            state.finished = true;
                            let completion = state.accumulator.finish();
                            return Some((Ok(CompletionChunk::Completed(completion)), state));
                        }
                        match serde_json::from_str::<StreamChunk>(data) {
                            Ok(chunk) => match state.accumulator.apply(chunk) {
                                Ok(Some(text)) => {
                                    return Some((Ok(CompletionChunk::TextDelta(text)), state));
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    state.finished = true;
                                    return Some((Err(e), state));
                                }
                            },
                            Err(e) => {
                                state.finished = true;
                                return Some((
                                    Err(LucciError::llm(format!(
                                        "Failed to parse stream chunk: {}",
                                        e
                                    ))),
                                    state,
                                ));
                            }
                        }
                    }
                    Some(Err(e)) => {
                        state.finished = true;
                        return Some((
                            Err(LucciError::llm_transient(format!("Stream read error: {}", e))),
                            state,
                        ));
                    }
                    None => {
                        state.finished = true;
                        let completion = state.accumulator.finish();
                        return Some((Ok(CompletionChunk::Completed(completion)), state));
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "openai".to_string(),
            model_name: self.model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ToolInvocation;
    use serde_json::json;

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAIProvider::new("test-key", "gpt-4o");
        assert_eq!(provider.model(), "gpt-4o");
        assert_eq!(provider.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_custom_base_url_trailing_slash() {
        let provider = OpenAIProvider::with_base_url("k", "m", "http://localhost:8080/v1/");
        assert_eq!(provider.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_convert_messages_with_tool_exchange() {
        let messages = vec![
            Message::user("balance?"),
            Message::assistant_tool_calls(vec![ToolInvocation::new(
                "call_1",
                "get_portfolio",
                json!({"address": "0xabc"}),
            )]),
            Message::tool_results(vec![
                ToolInvocation::new("call_1", "get_portfolio", json!({"address": "0xabc"}))
                    .with_result(json!({"status": "success"})),
            ]),
        ];

        let converted = convert_messages("You are Lucci", &messages);

        assert_eq!(converted.len(), 4);
        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[2].role, "assistant");
        assert!(converted[2].content.is_none());
        let calls = converted[2].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.arguments, r#"{"address":"0xabc"}"#);
        assert_eq!(converted[3].role, "tool");
        assert_eq!(converted[3].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_malformed_arguments_kept_as_string() {
        assert_eq!(parse_arguments("{not json"), json!("{not json"));
        assert_eq!(parse_arguments(""), json!({}));
    }

    #[test]
    fn test_stream_accumulator_rebuilds_tool_calls() {
        let mut acc = StreamAccumulator::default();
        let chunks = [
            json!({"choices": [{"delta": {"content": "Let me "}}]}),
            json!({"choices": [{"delta": {"content": "check."}}]}),
            json!({"choices": [{"delta": {"tool_calls": [
                {"index": 0, "id": "call_9", "function": {"name": "get_portfolio", "arguments": "{\"addr"}}
            ]}}]}),
            json!({"choices": [{"delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "ess\":\"0x1\"}"}}
            ]}}]}),
        ];

        let mut deltas = Vec::new();
        for chunk in chunks {
            if let Some(text) = acc.apply(serde_json::from_value(chunk).unwrap()).unwrap() {
                deltas.push(text);
            }
        }

        assert_eq!(deltas, vec!["Let me ", "check."]);
        match acc.finish() {
            Completion::ToolCalls { text, calls } => {
                assert_eq!(text.as_deref(), Some("Let me check."));
                assert_eq!(calls[0].id, "call_9");
                assert_eq!(calls[0].arguments, json!({"address": "0x1"}));
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[test]
    fn test_stream_accumulator_rejects_index_jump() {
        let mut acc = StreamAccumulator::default();
        let chunk = json!({"choices": [{"delta": {"tool_calls": [
            {"index": 4_000_000_000u64, "id": "call_x", "function": {"name": "swap"}}
        ]}}]});

        let err = acc.apply(serde_json::from_value(chunk).unwrap()).unwrap_err();
        assert!(matches!(err, LucciError::Llm { .. }));
        assert!(acc.calls.is_empty());
    }

    #[test]
    fn test_model_info() {
        let info = OpenAIProvider::new("test-key", "gpt-4o-mini").model_info();
        assert_eq!(info.provider, "openai");
        assert_eq!(info.model_name, "gpt-4o-mini");
    }
}

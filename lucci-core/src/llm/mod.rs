//! Completion engine abstraction
//!
//! The agent talks to a language model only through [`LLMProvider`]. A
//! provider receives the system prompt, the turn transcript and the tool
//! definitions, and answers with either final text or a batch of tool calls.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;

use crate::conversation::Message;
use crate::error::Result;

pub mod factory;
pub mod providers;
pub mod retry;
pub mod scripted;

pub use factory::LLMProviderFactory;
pub use providers::KeywordProvider;
#[cfg(feature = "llm-openai")]
pub use providers::OpenAIProvider;
pub use retry::{RetryConfig, with_retry};
pub use scripted::ScriptedProvider;

/// Tool definition advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object
    pub parameters: Value,
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// What the model decided to do next
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Final answer for the user
    Text(String),
    /// One or more tool calls, optionally preceded by text
    ToolCalls {
        text: Option<String>,
        calls: Vec<ToolCall>,
    },
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Completion::Text(text.into())
    }

    pub fn tool_call(call: ToolCall) -> Self {
        Completion::ToolCalls {
            text: None,
            calls: vec![call],
        }
    }

    /// Text emitted alongside the decision, if any
    pub fn text_part(&self) -> Option<&str> {
        match self {
            Completion::Text(text) => Some(text),
            Completion::ToolCalls { text, .. } => text.as_deref(),
        }
    }
}

/// Request to a completion engine
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            system: system.into(),
            messages,
            tools: Vec::new(),
            temperature: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature.map(|t| t.clamp(0.0, 2.0));
        self
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }
}

/// Incremental output of a streaming completion
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionChunk {
    TextDelta(String),
    /// Always the last chunk of a successful stream
    Completed(Completion),
}

pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<CompletionChunk>> + Send>>;

/// Trait for completion engine implementations.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Decide the next step for the given transcript
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Streaming variant of [`LLMProvider::complete`].
    ///
    /// The default implementation emits any text as a single delta followed
    /// by the completed decision.
    async fn complete_stream(&self, request: &CompletionRequest) -> Result<CompletionStream> {
        let completion = self.complete(request).await?;
        let mut chunks = Vec::with_capacity(2);
        if let Some(text) = completion.text_part().filter(|t| !t.is_empty()) {
            chunks.push(Ok(CompletionChunk::TextDelta(text.to_string())));
        }
        chunks.push(Ok(CompletionChunk::Completed(completion)));
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    /// Get model information
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "unknown".to_string(),
            model_name: "unknown".to_string(),
        }
    }
}

/// Model information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub provider: String,
    pub model_name: String,
}

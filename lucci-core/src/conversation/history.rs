//! Turn transcript

use serde::{Deserialize, Serialize};

use super::message::{Message, MessageRole, ToolInvocation};

/// Ordered transcript of a chat turn.
///
/// Starts from the caller's messages and grows as the agent records
/// assistant replies, tool calls and tool results. Nothing is ever removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from caller messages, dropping any system messages.
    ///
    /// The agent always supplies its own system prompt.
    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        Self {
            messages: messages
                .into_iter()
                .filter(|m| m.role != MessageRole::System)
                .collect(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.push(Message::user(text));
    }

    pub fn add_assistant_message(&mut self, text: impl Into<String>) {
        self.push(Message::assistant(text));
    }

    /// Record the assistant's tool calls, preceded by any text it emitted
    pub fn add_tool_calls(&mut self, text: Option<&str>, calls: Vec<ToolInvocation>) {
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            self.add_assistant_message(text);
        }
        if !calls.is_empty() {
            self.push(Message::assistant_tool_calls(calls));
        }
    }

    pub fn add_tool_results(&mut self, results: Vec<ToolInvocation>) {
        if !results.is_empty() {
            self.push(Message::tool_results(results));
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Text of the most recent user message
    pub fn last_user_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(Message::text_content)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

//! Conversation messages

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool call requested by the assistant, with its result once known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ToolInvocation {
    pub fn new(tool_call_id: impl Into<String>, tool_name: impl Into<String>, args: Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            args,
            result: None,
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }
}

/// One part of a message's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ToolInvocation(ToolInvocation),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Deserialize)]
struct RawMessage {
    role: MessageRole,
    content: RawContent,
}

impl From<RawMessage> for Message {
    fn from(raw: RawMessage) -> Self {
        let content = match raw.content {
            RawContent::Text(text) => vec![ContentPart::Text { text }],
            RawContent::Parts(parts) => parts,
        };
        Message {
            role: raw.role,
            content,
        }
    }
}

/// A message in a conversation.
///
/// Deserializes from either `{"role": "user", "content": "gm"}` or a list of
/// typed content parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMessage")]
pub struct Message {
    pub role: MessageRole,
    pub content: Vec<ContentPart>,
}

impl Message {
    fn text(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentPart::Text { text: text.into() }],
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::text(MessageRole::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(MessageRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(MessageRole::Assistant, text)
    }

    /// Assistant message requesting tool calls
    pub fn assistant_tool_calls(invocations: Vec<ToolInvocation>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: invocations
                .into_iter()
                .map(ContentPart::ToolInvocation)
                .collect(),
        }
    }

    /// Tool message carrying invocation results
    pub fn tool_results(invocations: Vec<ToolInvocation>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: invocations
                .into_iter()
                .map(ContentPart::ToolInvocation)
                .collect(),
        }
    }

    /// Concatenated text parts
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ToolInvocation(_) => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn tool_invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.content.iter().filter_map(|part| match part {
            ContentPart::ToolInvocation(invocation) => Some(invocation),
            ContentPart::Text { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_string_content() {
        let message: Message =
            serde_json::from_value(json!({"role": "user", "content": "gm"})).unwrap();
        assert_eq!(message, Message::user("gm"));
    }

    #[test]
    fn test_part_content_round_trips_invocations() {
        let message: Message = serde_json::from_value(json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Checking."},
                {
                    "type": "tool_invocation",
                    "toolCallId": "call_1",
                    "toolName": "get_portfolio",
                    "args": {"address": "0xabc"}
                }
            ]
        }))
        .unwrap();

        assert_eq!(message.text_content(), "Checking.");
        let invocation = message.tool_invocations().next().unwrap();
        assert_eq!(invocation.tool_name, "get_portfolio");
        assert!(invocation.result.is_none());
    }

    #[test]
    fn test_tool_role() {
        let message = Message::tool_results(vec![
            ToolInvocation::new("call_1", "swap", json!({})).with_result(json!({"status": "error"})),
        ]);
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["content"][0]["result"]["status"], "error");
    }
}

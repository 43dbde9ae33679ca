//! Conversation messages and turn transcripts
//!
//! Messages carry either plain text or tool invocations. A
//! [`ConversationHistory`] is the append-only transcript the agent builds up
//! during a single chat turn.
//!
//! # Example
//!
//! ```rust
//! use lucci_core::conversation::{ConversationHistory, Message};
//!
//! let mut history = ConversationHistory::from_messages(vec![Message::user("gm")]);
//! history.add_assistant_message("gm! How can I help?");
//! assert_eq!(history.len(), 2);
//! ```

mod history;
mod message;

pub use history::ConversationHistory;
pub use message::{ContentPart, Message, MessageRole, ToolInvocation};

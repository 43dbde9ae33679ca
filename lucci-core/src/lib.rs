//! # Lucci - Conversational DeFi Agent
//!
//! Lucci turns natural-language requests into portfolio lookups, knowledge
//! answers and prepared (never broadcast) on-chain transactions:
//! - Capability contract with schema-validated arguments
//! - Append-only tool registry frozen into a shareable tool map
//! - Context provider for portfolio, knowledge and price data
//! - Bounded multi-step control loop with streaming events
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lucci_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let agent = Agent::from_config(LucciConfig::load()?)?;
//!
//!     let output = agent
//!         .chat(vec![Message::user("swap 1 SOL for USDC")], Some("0xabc123def"))
//!         .await?;
//!     println!("{} ({})", output.text, output.finish_reason);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Tools**: [`tools::Capability`] implementations registered in a
//!   [`tools::ToolRegistry`] and executed through a guarded runtime
//! - **Actions**: `swap` and `transfer`, which always return
//!   `requires_confirmation` with an unsigned transaction
//! - **Context**: [`context::ContextProvider`] renders user context into the
//!   system prompt
//! - **Agent**: [`agent::Agent`] drives the completion engine within a step
//!   budget
//!
//! ## Feature Flags
//!
//! - `llm-openai` (default): OpenAI-compatible completion engine over reqwest

pub mod actions;
pub mod agent;
pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod tools;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actions::{ProtocolRouting, Swap, Transfer};
    pub use crate::agent::{
        Agent, AgentBuilder, AgentEvent, AgentEventStream, ChatOutput, FinishReason,
    };
    pub use crate::config::{
        AgentConfig, LLMProvider as LLMProviderType, LLMProviderConfig, LucciConfig,
    };
    pub use crate::context::{
        ContextProvider, KnowledgeBase, MockPortfolioProvider, PortfolioProvider,
        PortfolioSnapshot, StaticKnowledgeBase,
    };
    pub use crate::conversation::{ContentPart, Message, MessageRole, ToolInvocation};
    pub use crate::error::{LucciError, Result};
    pub use crate::llm::{
        Completion, CompletionRequest, KeywordProvider, LLMProvider, LLMProviderFactory,
        ScriptedProvider, ToolCall, ToolDefinition,
    };
    pub use crate::tools::{
        ActionResult, ActionStatus, ArgSchema, Capability, FieldSpec, RegistryError, ToolError,
        ToolMap, ToolRegistry, ValidatedArgs,
    };
}

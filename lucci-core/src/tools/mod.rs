//! Tool system for agent capabilities
//!
//! This module provides the uniform dispatch layer between the control loop
//! and pluggable capabilities. Key features:
//! - A single [`Capability`] contract for built-in and mutating tools
//! - Structural argument schemas that report every violation
//! - An append-only registry frozen into a lock-free [`ToolMap`]
//! - Guarded execution with timeouts, panic containment and provenance
//!
//! # Example
//!
//! ```rust,no_run
//! use lucci_core::context::ContextProvider;
//! use lucci_core::tools::ToolRegistry;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), lucci_core::tools::ToolError> {
//! let registry = ToolRegistry::new(Arc::new(ContextProvider::mock()));
//! let tools = registry.build_tool_map();
//!
//! let result = tools.invoke("search_knowledge", &json!({"query": "jupiter"})).await?;
//! # Ok(())
//! # }
//! ```

mod builtin;
mod capability;
mod registry;
mod result;
mod runtime;
mod schema;

pub use builtin::{
    BUILTIN_TOOL_NAMES, GET_PORTFOLIO, GetPortfolioTool, SEARCH_KNOWLEDGE, SearchKnowledgeTool,
};
pub use capability::{BoxedCapability, Capability, CapabilityDescriptor};
pub use registry::{RegistryError, ToolEntry, ToolMap, ToolRegistry};
pub use result::{ActionResult, ActionStatus, ToolError, ToolProvenance, ValidationError};
pub use runtime::{ToolRuntime, ToolRuntimeConfig, args_hash};
pub use schema::{ArgSchema, Constraint, FieldKind, FieldSpec, ValidatedArgs};

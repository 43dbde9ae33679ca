//! The capability contract
//!
//! A capability is a named action the control loop can invoke: the built-in
//! read-only lookups as well as the mutating DeFi actions. Each one carries
//! an immutable descriptor (type, description, argument schema) and an async
//! `execute` that receives arguments already validated against that schema.

use super::result::{ActionResult, ToolError, ValidationError};
use super::schema::{ArgSchema, ValidatedArgs};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Side-effect-free description of a capability
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityDescriptor {
    #[serde(rename = "type")]
    pub capability_type: String,
    pub description: String,
    pub schema: ArgSchema,
    pub mutating: bool,
}

/// A pluggable action exposed to the completion engine.
///
/// Implementations are constructed once and never mutated afterwards.
/// Expected business failures (unsupported chain, identical tokens) are
/// returned as [`ActionResult::error`]; `Err` is reserved for internal
/// failures and is converted into an error result by the registry.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Unique, case-sensitive type tag
    fn capability_type(&self) -> &str;

    /// Description shown to the completion engine
    fn description(&self) -> &str;

    /// Argument schema
    fn schema(&self) -> &ArgSchema;

    /// Whether the capability prepares an on-chain state change
    fn is_mutating(&self) -> bool {
        false
    }

    fn describe(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            capability_type: self.capability_type().to_string(),
            description: self.description().to_string(),
            schema: self.schema().clone(),
            mutating: self.is_mutating(),
        }
    }

    /// Check raw arguments, reporting every violation
    fn validate(&self, raw: &Value) -> Result<ValidatedArgs, Vec<ValidationError>> {
        self.schema().validate(raw)
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<ActionResult, ToolError>;
}

/// Shared capability handle
pub type BoxedCapability = Arc<dyn Capability>;

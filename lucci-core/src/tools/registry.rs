//! Tool Registry and the frozen Tool Map
//!
//! The `ToolRegistry` is append-only during agent setup:
//! - Built-in read-only tools are installed on construction
//! - Capabilities are registered once, keyed by their type tag
//! - Duplicate, reserved and empty type tags are rejected
//!
//! [`ToolRegistry::build_tool_map`] freezes the result into a [`ToolMap`], an
//! immutable `Arc`-backed view that is cheap to clone and safe to share
//! between concurrent conversations without locks.
//!
//! # Example
//!
//! ```rust,ignore
//! use lucci_core::tools::ToolRegistry;
//!
//! let mut registry = ToolRegistry::new(context.clone());
//! registry.register(Arc::new(Swap::new(routing, context.clone())))?;
//!
//! let tools = registry.build_tool_map();
//! let result = tools.invoke("swap", &json!({"tokenIn": "SOL", "tokenOut": "USDC", "amount": 1})).await?;
//! ```

use super::builtin::{BUILTIN_TOOL_NAMES, builtin_tools};
use super::capability::{Capability, CapabilityDescriptor};
use super::result::{ActionResult, ToolError, ToolProvenance};
use super::runtime::{ToolRuntime, ToolRuntimeConfig};
use crate::context::ContextProvider;
use crate::llm::ToolDefinition;
use serde_json::Value;
use std::sync::Arc;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A capability with this type is already registered
    #[error("capability '{0}' is already registered")]
    DuplicateCapability(String),

    /// The type collides with a built-in tool
    #[error("'{0}' is reserved for a built-in tool")]
    ReservedName(String),

    /// The capability declared an empty type
    #[error("capability type must not be empty")]
    EmptyType,
}

/// Registry of capabilities available to the control loop
pub struct ToolRegistry {
    builtins: Vec<Arc<dyn Capability>>,
    capabilities: Vec<Arc<dyn Capability>>,
    runtime: ToolRuntime,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Registry holding only the built-in tools
    pub fn new(context: Arc<ContextProvider>) -> Self {
        Self {
            builtins: builtin_tools(context),
            capabilities: Vec::new(),
            runtime: ToolRuntime::default(),
        }
    }

    /// Use a custom runtime configuration
    pub fn with_runtime_config(mut self, config: ToolRuntimeConfig) -> Self {
        self.runtime = ToolRuntime::new(config);
        self
    }

    /// Register a capability.
    ///
    /// On error the registry is unchanged and keeps any earlier registration
    /// of the same type.
    pub fn register(&mut self, capability: Arc<dyn Capability>) -> Result<(), RegistryError> {
        let name = capability.capability_type();
        if name.is_empty() {
            return Err(RegistryError::EmptyType);
        }
        if BUILTIN_TOOL_NAMES.contains(&name) {
            return Err(RegistryError::ReservedName(name.to_string()));
        }
        if self.contains(name) {
            return Err(RegistryError::DuplicateCapability(name.to_string()));
        }

        tracing::debug!(tool = %name, mutating = capability.is_mutating(), "Registered capability");
        self.capabilities.push(capability);
        Ok(())
    }

    /// Register multiple capabilities, stopping at the first failure
    pub fn register_all(
        &mut self,
        capabilities: impl IntoIterator<Item = Arc<dyn Capability>>,
    ) -> Result<(), RegistryError> {
        for capability in capabilities {
            self.register(capability)?;
        }
        Ok(())
    }

    fn all(&self) -> impl Iterator<Item = &Arc<dyn Capability>> {
        self.builtins.iter().chain(self.capabilities.iter())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.all().find(|c| c.capability_type() == name)
    }

    /// Check if a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All tool names, built-ins first
    pub fn names(&self) -> Vec<&str> {
        self.all().map(|c| c.capability_type()).collect()
    }

    /// Number of tools including built-ins
    pub fn len(&self) -> usize {
        self.builtins.len() + self.capabilities.len()
    }

    /// Always false: built-ins are installed on construction
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Descriptors of every tool
    pub fn describe_all(&self) -> Vec<CapabilityDescriptor> {
        self.all().map(|c| c.describe()).collect()
    }

    /// Freeze the registry into a shareable tool map
    pub fn build_tool_map(&self) -> ToolMap {
        let entries = self
            .all()
            .map(|capability| ToolEntry {
                input_schema: capability.schema().to_json_schema(),
                capability: Arc::clone(capability),
            })
            .collect();

        ToolMap {
            inner: Arc::new(ToolMapInner {
                entries,
                runtime: self.runtime.clone(),
            }),
        }
    }

    /// Validate and execute a tool by name
    pub async fn invoke(&self, name: &str, raw: &Value) -> Result<ActionResult, ToolError> {
        let capability = self.get(name).ok_or_else(|| ToolError::NotFound {
            name: name.to_string(),
        })?;
        let (result, _) = self.runtime.invoke(capability.as_ref(), raw).await?;
        Ok(result)
    }
}

/// One entry of a frozen [`ToolMap`]
#[derive(Clone)]
pub struct ToolEntry {
    capability: Arc<dyn Capability>,
    input_schema: Value,
}

impl std::fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolEntry")
            .field("name", &self.name())
            .field("mutating", &self.is_mutating())
            .finish()
    }
}

impl ToolEntry {
    pub fn name(&self) -> &str {
        self.capability.capability_type()
    }

    pub fn description(&self) -> &str {
        self.capability.description()
    }

    /// JSON Schema rendered from the capability's argument schema
    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    pub fn is_mutating(&self) -> bool {
        self.capability.is_mutating()
    }

    pub fn descriptor(&self) -> CapabilityDescriptor {
        self.capability.describe()
    }

    /// Definition handed to the completion engine
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.input_schema.clone(),
        }
    }
}

struct ToolMapInner {
    entries: Vec<ToolEntry>,
    runtime: ToolRuntime,
}

/// Immutable name-to-tool mapping shared by concurrent turns
#[derive(Clone)]
pub struct ToolMap {
    inner: Arc<ToolMapInner>,
}

impl std::fmt::Debug for ToolMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.inner.entries.iter()).finish()
    }
}

impl ToolMap {
    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.inner.entries.iter().find(|e| e.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.inner.entries.iter().map(ToolEntry::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolEntry> {
        self.inner.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Tool definitions for the completion engine
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.iter().map(ToolEntry::definition).collect()
    }

    /// Validate and execute a tool by name
    pub async fn invoke(&self, name: &str, raw: &Value) -> Result<ActionResult, ToolError> {
        self.invoke_traced(name, raw).await.map(|(result, _)| result)
    }

    /// Like [`ToolMap::invoke`], also returning the provenance record
    pub async fn invoke_traced(
        &self,
        name: &str,
        raw: &Value,
    ) -> Result<(ActionResult, ToolProvenance), ToolError> {
        let entry = self.get(name).ok_or_else(|| {
            tracing::warn!(tool = %name, "Requested tool is not registered");
            ToolError::NotFound {
                name: name.to_string(),
            }
        })?;
        self.inner
            .runtime
            .invoke(entry.capability.as_ref(), raw)
            .await
    }
}

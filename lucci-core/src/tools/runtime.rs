//! Guarded capability execution
//!
//! The runtime wraps every invocation with:
//! - Argument validation before any side effect
//! - A per-tool timeout
//! - Panic containment at the capability boundary
//! - Status checks (mutating actions must ask for confirmation)
//! - Provenance recording

use super::capability::Capability;
use super::result::{ActionResult, ActionStatus, ToolError, ToolProvenance};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRuntimeConfig {
    /// Default timeout for tool execution
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,

    /// Per-tool timeout overrides
    #[serde(default)]
    pub tool_timeouts: HashMap<String, humantime_serde::Serde<Duration>>,
}

impl Default for ToolRuntimeConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            tool_timeouts: HashMap::new(),
        }
    }
}

impl ToolRuntimeConfig {
    /// Create a config with a specific timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Add a tool-specific timeout
    pub fn with_tool_timeout(mut self, tool_name: impl Into<String>, timeout: Duration) -> Self {
        self.tool_timeouts.insert(tool_name.into(), timeout.into());
        self
    }
}

/// Hash of the argument payload used for provenance
pub fn args_hash(args: &Value) -> String {
    let args_json = serde_json::to_string(args).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(args_json.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Executes capabilities with safety enforcement
#[derive(Debug, Clone, Default)]
pub struct ToolRuntime {
    config: ToolRuntimeConfig,
}

impl ToolRuntime {
    pub fn new(config: ToolRuntimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ToolRuntimeConfig {
        &self.config
    }

    /// Get timeout for a specific tool
    pub fn timeout_for(&self, tool_name: &str) -> Duration {
        self.config
            .tool_timeouts
            .get(tool_name)
            .map(|t| **t)
            .unwrap_or(self.config.default_timeout)
    }

    /// Validate and execute a capability.
    ///
    /// Returns `Err` only for [`ToolError::InvalidArguments`], in which case
    /// the capability was never called. Every execution failure (error,
    /// panic, timeout) comes back as an `error` [`ActionResult`].
    pub async fn invoke(
        &self,
        capability: &dyn Capability,
        raw: &Value,
    ) -> Result<(ActionResult, ToolProvenance), ToolError> {
        let tool_name = capability.capability_type();

        let args = capability.validate(raw).map_err(|violations| {
            tracing::debug!(
                tool = %tool_name,
                violations = violations.len(),
                "Rejected tool arguments"
            );
            ToolError::InvalidArguments {
                name: tool_name.to_string(),
                violations,
            }
        })?;

        let provenance = ToolProvenance::new(tool_name, args_hash(&args.clone().into_value()));
        let tool_timeout = self.timeout_for(tool_name);
        let started = Instant::now();

        let execution = AssertUnwindSafe(capability.execute(args)).catch_unwind();
        let result = match timeout(tool_timeout, execution).await {
            Ok(Ok(Ok(result))) => self.enforce_status(capability, result),
            Ok(Ok(Err(error))) => {
                tracing::warn!(tool = %tool_name, error = %error, "Tool execution failed");
                error.to_action_result(tool_name)
            }
            Ok(Err(payload)) => {
                let message = panic_message(&*payload);
                tracing::error!(tool = %tool_name, panic = %message, "Tool panicked");
                ToolError::execution(format!("capability panicked: {}", message))
                    .to_action_result(tool_name)
            }
            Err(_) => {
                tracing::warn!(tool = %tool_name, timeout = ?tool_timeout, "Tool timed out");
                ToolError::Timeout(tool_timeout).to_action_result(tool_name)
            }
        };

        let provenance = provenance
            .with_duration(started.elapsed())
            .with_status(result.status);

        tracing::info!(
            tool = %provenance.tool_name,
            args_hash = %provenance.args_hash,
            status = %provenance.status,
            duration_ms = provenance.duration.as_millis() as u64,
            "Tool invoked"
        );

        Ok((result, provenance))
    }

    fn enforce_status(&self, capability: &dyn Capability, result: ActionResult) -> ActionResult {
        let tool_name = capability.capability_type();
        match (capability.is_mutating(), result.status) {
            (true, ActionStatus::Success) => {
                tracing::error!(tool = %tool_name, "Mutating tool reported success without confirmation");
                ActionResult::error(
                    tool_name,
                    "mutating action returned success without user confirmation",
                )
            }
            (true, ActionStatus::RequiresConfirmation) if result.unsigned_tx.is_none() => {
                ActionResult::error(tool_name, "confirmation requested without a transaction")
            }
            (false, ActionStatus::RequiresConfirmation) => {
                tracing::error!(tool = %tool_name, "Read-only tool requested confirmation");
                ActionResult::error(tool_name, "read-only action cannot request confirmation")
            }
            _ => result,
        }
    }
}

//! Action results and the tool error model
//!
//! [`ActionResult`] is the JSON contract shared with the chat UI. Every
//! capability, built-in or mutating, reports its outcome in this shape:
//!
//! ```json
//! {
//!   "status": "requires_confirmation",
//!   "type": "swap",
//!   "unsignedTx": "9f2c...",
//!   "summary": "Swap 1 SOL for approximately 150 USDC",
//!   "details": { "chain": "solana", "protocol": "jupiter" }
//! }
//! ```
//!
//! [`ToolError`] covers dispatch failures that never reach a capability
//! (unknown tool, rejected arguments) plus internal failures, which the
//! registry converts back into an `error` result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

/// Outcome status of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Completed. Only read-only actions report this.
    Success,

    /// A transaction was prepared and awaits the user's signature
    RequiresConfirmation,

    /// Business-level failure; `details.reason` explains it
    Error,
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionStatus::Success => "success",
            ActionStatus::RequiresConfirmation => "requires_confirmation",
            ActionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Result of invoking a capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub status: ActionStatus,

    /// Capability type that produced the result
    #[serde(rename = "type")]
    pub action_type: String,

    #[serde(default)]
    pub details: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,

    /// Serialized transaction the user's wallet must sign
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsigned_tx: Option<String>,

    /// Human-readable description of the pending transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ActionResult {
    /// Successful result carrying `details`
    pub fn success(action_type: impl Into<String>, details: Value) -> Self {
        Self {
            status: ActionStatus::Success,
            action_type: action_type.into(),
            details,
            tx_hash: None,
            unsigned_tx: None,
            summary: None,
        }
    }

    /// Prepared transaction awaiting the user's signature
    pub fn requires_confirmation(
        action_type: impl Into<String>,
        unsigned_tx: impl Into<String>,
        summary: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            status: ActionStatus::RequiresConfirmation,
            action_type: action_type.into(),
            details,
            tx_hash: None,
            unsigned_tx: Some(unsigned_tx.into()),
            summary: Some(summary.into()),
        }
    }

    /// Business-level failure with `details = { "reason": reason }`
    pub fn error(action_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Error,
            action_type: action_type.into(),
            details: json!({ "reason": reason.into() }),
            tx_hash: None,
            unsigned_tx: None,
            summary: None,
        }
    }

    /// Attach a transaction hash
    pub fn with_tx_hash(mut self, tx_hash: impl Into<String>) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == ActionStatus::Error
    }

    pub fn requires_user_confirmation(&self) -> bool {
        self.status == ActionStatus::RequiresConfirmation
    }

    /// Failure reason for `error` results
    pub fn reason(&self) -> Option<&str> {
        if !self.is_error() {
            return None;
        }
        self.details.get("reason").and_then(Value::as_str)
    }
}

/// Single argument violation reported by schema validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Offending field, or `$` for the payload itself
    pub field: String,

    pub message: String,

    /// Machine-readable code (`required`, `invalid_type`, `not_positive`, ...)
    pub code: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.field, self.message)
    }
}

fn join_violations(violations: &[ValidationError]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Tool dispatch and execution errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    /// No capability is registered under the requested name
    #[error("tool not found: {name}")]
    NotFound { name: String },

    /// Arguments failed schema validation; nothing was executed
    #[error("invalid arguments for {name}: {}", join_violations(.violations))]
    InvalidArguments {
        name: String,
        violations: Vec<ValidationError>,
    },

    /// Internal failure inside a capability
    #[error("execution failed: {reason}")]
    Execution { reason: String },

    /// Capability did not finish within its time limit
    #[error("tool execution timed out after {0:?}")]
    Timeout(Duration),
}

impl ToolError {
    /// Internal execution failure
    pub fn execution(reason: impl Into<String>) -> Self {
        ToolError::Execution {
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::NotFound { .. } => "TOOL_NOT_FOUND",
            ToolError::InvalidArguments { .. } => "INVALID_ARGUMENTS",
            ToolError::Execution { .. } => "EXECUTION_ERROR",
            ToolError::Timeout(_) => "TIMEOUT",
        }
    }

    /// Violations for [`ToolError::InvalidArguments`], empty otherwise
    pub fn violations(&self) -> &[ValidationError] {
        match self {
            ToolError::InvalidArguments { violations, .. } => violations,
            _ => &[],
        }
    }

    /// Render the error as an `error` result the completion engine can read
    pub fn to_action_result(&self, action_type: &str) -> ActionResult {
        let mut result = ActionResult::error(action_type, self.to_string());
        if let Value::Object(details) = &mut result.details {
            details.insert("code".to_string(), Value::from(self.code()));
            if !self.violations().is_empty() {
                details.insert("violations".to_string(), json!(self.violations()));
            }
        }
        result
    }
}

/// Provenance metadata recorded for every guarded execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolProvenance {
    pub tool_name: String,

    /// Truncated SHA-256 of the validated arguments
    pub args_hash: String,

    pub started_at: DateTime<Utc>,

    #[serde(with = "duration_millis")]
    pub duration: Duration,

    /// Status of the produced result
    pub status: ActionStatus,
}

impl ToolProvenance {
    pub fn new(tool_name: impl Into<String>, args_hash: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            args_hash: args_hash.into(),
            started_at: Utc::now(),
            duration: Duration::ZERO,
            status: ActionStatus::Success,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_status(mut self, status: ActionStatus) -> Self {
        self.status = status;
        self
    }
}

// Serde helper for Duration serialization as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

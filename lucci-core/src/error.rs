//! Error types for Lucci operations

use crate::tools::{RegistryError, ToolError};

/// Result type for Lucci operations
pub type Result<T> = std::result::Result<T, LucciError>;

/// Error types for the Lucci agent
#[derive(Debug, thiserror::Error)]
pub enum LucciError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Capability registration failed
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Tool dispatch failed
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Completion engine failure
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        /// Whether the request may succeed if retried
        retryable: bool,
    },

    /// Caller supplied an unusable value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LucciError {
    /// Completion engine error that should not be retried
    pub fn llm(message: impl Into<String>) -> Self {
        LucciError::Llm {
            message: message.into(),
            retryable: false,
        }
    }

    /// Completion engine error caused by a transient condition
    pub fn llm_transient(message: impl Into<String>) -> Self {
        LucciError::Llm {
            message: message.into(),
            retryable: true,
        }
    }

    /// Whether retrying the failed operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, LucciError::Llm { retryable: true, .. })
    }
}

impl From<String> for LucciError {
    fn from(s: String) -> Self {
        LucciError::Other(s)
    }
}

impl From<&str> for LucciError {
    fn from(s: &str) -> Self {
        LucciError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for LucciError {
    fn from(err: anyhow::Error) -> Self {
        LucciError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_only_for_transient_llm_errors() {
        assert!(LucciError::llm_transient("503").is_retryable());
        assert!(!LucciError::llm("401 unauthorized").is_retryable());
        assert!(!LucciError::Configuration("bad".into()).is_retryable());
    }

    #[test]
    fn test_tool_error_conversion() {
        let err: LucciError = ToolError::NotFound {
            name: "bridge".to_string(),
        }
        .into();
        assert!(matches!(err, LucciError::Tool(ToolError::NotFound { .. })));
        assert!(err.to_string().contains("bridge"));
    }
}

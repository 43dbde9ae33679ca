//! Events emitted while a turn runs

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::FinishReason;
use crate::tools::ActionResult;

/// Progress of a streamed chat turn, in temporal order.
///
/// A stream always ends with exactly one `Finish` or `Error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AgentEvent {
    TextDelta {
        text: String,
    },
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        args: Value,
    },
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        result: ActionResult,
    },
    Finish {
        text: String,
        finish_reason: FinishReason,
        steps: usize,
        incomplete: bool,
    },
    Error {
        message: String,
    },
}

impl AgentEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            AgentEvent::TextDelta { .. } => "text_delta",
            AgentEvent::ToolCall { .. } => "tool_call",
            AgentEvent::ToolResult { .. } => "tool_result",
            AgentEvent::Finish { .. } => "finish",
            AgentEvent::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Finish { .. } | AgentEvent::Error { .. })
    }
}

/// Where a running turn reports progress
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::Sender<AgentEvent>>,
    cancel: CancellationToken,
}

impl EventSink {
    /// Sink that drops every event and is never cancelled
    pub(crate) fn silent() -> Self {
        Self::default()
    }

    pub(crate) fn channel(tx: mpsc::Sender<AgentEvent>, cancel: CancellationToken) -> Self {
        Self {
            tx: Some(tx),
            cancel,
        }
    }

    pub(crate) fn is_streaming(&self) -> bool {
        self.tx.is_some()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub(crate) async fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).await.is_err() {
                self.cancel.cancel();
            }
        }
    }
}

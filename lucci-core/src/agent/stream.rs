//! Streaming chat turns

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::{Agent, AgentEvent, EventSink};
use crate::conversation::Message;

const EVENT_BUFFER: usize = 32;

/// Events of a running turn.
///
/// Dropping the stream cancels the turn at its next suspend point.
pub struct AgentEventStream {
    inner: ReceiverStream<AgentEvent>,
    _guard: DropGuard,
}

impl Stream for AgentEventStream {
    type Item = AgentEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Agent {
    /// Run one turn on a background task, streaming its progress
    pub fn chat_stream(
        &self,
        messages: Vec<Message>,
        user_address: Option<String>,
    ) -> AgentEventStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        let sink = EventSink::channel(tx, cancel.clone());
        let agent = self.clone();

        tokio::spawn(async move {
            let terminal = match agent
                .run_turn(messages, user_address.as_deref(), &sink)
                .await
            {
                Ok(output) => AgentEvent::Finish {
                    text: output.text,
                    finish_reason: output.finish_reason,
                    steps: output.steps,
                    incomplete: output.incomplete,
                },
                Err(e) => {
                    tracing::error!(error = %e, "Chat turn failed");
                    AgentEvent::Error {
                        message: e.to_string(),
                    }
                }
            };

            if !sink.is_cancelled() {
                sink.emit(terminal).await;
            }
        });

        AgentEventStream {
            inner: ReceiverStream::new(rx),
            _guard: cancel.drop_guard(),
        }
    }
}

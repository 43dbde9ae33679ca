//! HTTP endpoint streaming chat turns as server-sent events

use anyhow::Result;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use lucci_core::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
pub struct AppState {
    pub agent: Agent,
}

/// Body of `POST /api/chat`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub user_address: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tools", get(list_tools))
        .route("/api/chat", post(chat))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until the process is stopped
pub async fn run(agent: Agent, bind: &str) -> Result<()> {
    let app = router(Arc::new(AppState { agent }));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": lucci_core::VERSION }))
}

async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Vec<ToolDefinition>> {
    Json(state.agent.tool_definitions())
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    if request.messages.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "messages must not be empty".to_string(),
        ));
    }

    tracing::info!(
        messages = request.messages.len(),
        has_address = request.user_address.is_some(),
        "Chat stream opened"
    );

    let events = state
        .agent
        .chat_stream(request.messages, request.user_address)
        .filter_map(|ev| async move {
            match Event::default().event(ev.name()).json_data(&ev) {
                Ok(sse) => Some(Ok::<_, Infallible>(sse)),
                Err(e) => {
                    tracing::error!(
                        event = ev.name(),
                        error = %e,
                        "Failed to serialize SSE event; dropping"
                    );
                    None
                }
            }
        });

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_accepts_plain_and_part_content() {
        let request: ChatRequest = serde_json::from_value(json!({
            "messages": [
                {"role": "user", "content": "show my portfolio"},
                {"role": "assistant", "content": [{"type": "text", "text": "Sure."}]}
            ],
            "userAddress": "0xabc123def"
        }))
        .unwrap();

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].text_content(), "show my portfolio");
        assert_eq!(request.messages[1].role, MessageRole::Assistant);
        assert_eq!(request.user_address.as_deref(), Some("0xabc123def"));
    }

    #[test]
    fn test_chat_request_address_optional() {
        let request: ChatRequest =
            serde_json::from_value(json!({"messages": [{"role": "user", "content": "gm"}]}))
                .unwrap();
        assert!(request.user_address.is_none());
    }
}

//! Scripted completion engine for tests and demos

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

use crate::error::{LucciError, Result};
use crate::llm::{Completion, CompletionRequest, LLMProvider, ModelInfo};

/// Replays a fixed sequence of completions and records every request.
///
/// Once the script runs out the fallback completion is returned, or an error
/// if there is none.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Completion>>>,
    fallback: Option<Completion>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(completions: impl IntoIterator<Item = Completion>) -> Self {
        Self {
            script: Mutex::new(completions.into_iter().map(Ok).collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Completion returned after the script is exhausted
    pub fn with_fallback(mut self, completion: Completion) -> Self {
        self.fallback = Some(completion);
        self
    }

    /// Queue an error as the next scripted response
    pub async fn push_error(&self, error: LucciError) {
        self.script.lock().await.push_back(Err(error));
    }

    /// Requests received so far
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.requests.lock().await.push(request.clone());

        match self.script.lock().await.pop_front() {
            Some(next) => next,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| LucciError::llm("scripted provider has no completions left")),
        }
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "scripted".to_string(),
            model_name: "script".to_string(),
        }
    }
}

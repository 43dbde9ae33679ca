//! Offline keyword router
//!
//! Picks tools by matching phrases in the latest user message and phrases
//! its final answer from the tool results it gets back. Useful for demos and
//! for running the agent without network access.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};

use crate::conversation::{Message, MessageRole};
use crate::error::Result;
use crate::llm::{Completion, CompletionRequest, LLMProvider, ModelInfo, ToolCall};
use crate::tools::{ActionResult, ActionStatus, GET_PORTFOLIO, SEARCH_KNOWLEDGE};

const SWAP: &str = "swap";
const TRANSFER: &str = "transfer";

/// Reply when no tool applies
pub const FALLBACK_REPLY: &str = "I can help you with checking your portfolio or executing trades on Solana. What would you like to do?";

const ASK_FOR_ADDRESS: &str =
    "Please share your wallet address so I can look up your portfolio.";

static SWAP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bswap\s+(\d+(?:\.\d+)?)\s+([a-z0-9]+)\s+(?:to|for|into)\s+([a-z0-9]+)(?:\s+on\s+([a-z]+))?",
    )
    .unwrap()
});

static TRANSFER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:send|transfer)\s+(\d+(?:\.\d+)?)\s+([a-z0-9]+)\s+to\s+([a-z0-9]+)(?:\s+on\s+([a-z]+))?",
    )
    .unwrap()
});

static ADDRESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(0x[0-9a-fA-F]{6,}|[1-9A-HJ-NP-Za-km-z]{32,44})\b").unwrap()
});

static PROMPT_ADDRESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"User Address:\s*(\S+)").unwrap()
});

/// Completion engine that routes on keywords instead of calling a model
#[derive(Debug, Clone, Default)]
pub struct KeywordProvider;

impl KeywordProvider {
    pub fn new() -> Self {
        Self
    }

    fn decide(&self, request: &CompletionRequest, text: &str) -> Completion {
        let lower = text.to_lowercase();

        if request.has_tool(SWAP) {
            if let Some(args) = parse_swap(text, &lower) {
                return Completion::tool_call(call(SWAP, args));
            }
        }

        if request.has_tool(TRANSFER) {
            if let Some(args) = parse_transfer(text) {
                return Completion::tool_call(call(TRANSFER, args));
            }
        }

        if request.has_tool(GET_PORTFOLIO)
            && (lower.contains("portfolio") || lower.contains("balance"))
        {
            return match find_address(text, &request.system) {
                Some(address) => {
                    Completion::tool_call(call(GET_PORTFOLIO, json!({ "address": address })))
                }
                None => Completion::text(ASK_FOR_ADDRESS),
            };
        }

        if request.has_tool(SEARCH_KNOWLEDGE)
            && ["how to", "explain", "what is"]
                .iter()
                .any(|p| lower.contains(p))
        {
            return Completion::tool_call(call(SEARCH_KNOWLEDGE, json!({ "query": text })));
        }

        Completion::text(FALLBACK_REPLY)
    }
}

fn call(name: &str, arguments: Value) -> ToolCall {
    ToolCall::new(
        format!("call_{}", uuid::Uuid::new_v4().simple()),
        name,
        arguments,
    )
}

fn parse_swap(text: &str, lower: &str) -> Option<Value> {
    if let Some(caps) = SWAP_PATTERN.captures(text) {
        let amount: f64 = caps[1].parse().ok()?;
        let mut args = json!({
            "tokenIn": caps[2].to_uppercase(),
            "tokenOut": caps[3].to_uppercase(),
            "amount": amount,
        });
        if let Some(chain) = caps.get(4) {
            args["chain"] = json!(chain.as_str().to_lowercase());
        }
        if lower.contains("jupiter") {
            args["protocol"] = json!("jupiter");
        }
        return Some(args);
    }

    // A bare "swap on jupiter" gets the demo trade
    if lower.contains("swap") && lower.contains("jupiter") {
        return Some(json!({
            "tokenIn": "SOL",
            "tokenOut": "USDC",
            "amount": 1,
            "chain": "solana",
            "protocol": "jupiter",
        }));
    }

    None
}

fn parse_transfer(text: &str) -> Option<Value> {
    let caps = TRANSFER_PATTERN.captures(text)?;
    let amount: f64 = caps[1].parse().ok()?;
    let to = caps[3].to_string();
    let chain = match caps.get(4) {
        Some(chain) => chain.as_str().to_lowercase(),
        None if to.starts_with("0x") => "ethereum".to_string(),
        None => "solana".to_string(),
    };

    Some(json!({
        "toAddress": to,
        "token": caps[2].to_uppercase(),
        "amount": amount,
        "chain": chain,
    }))
}

fn find_address(text: &str, system: &str) -> Option<String> {
    ADDRESS_PATTERN
        .captures(text)
        .map(|c| c[1].to_string())
        .or_else(|| {
            PROMPT_ADDRESS_PATTERN
                .captures(system)
                .map(|c| c[1].to_string())
        })
}

/// Phrase a final answer from the most recent tool results
fn synthesize(message: &Message) -> String {
    let replies: Vec<String> = message
        .tool_invocations()
        .filter_map(|invocation| {
            let result = invocation.result.as_ref()?;
            let result: ActionResult = serde_json::from_value(result.clone()).ok()?;
            Some(describe_result(&invocation.tool_name, &result))
        })
        .collect();

    if replies.is_empty() {
        "Task completed.".to_string()
    } else {
        replies.join(" ")
    }
}

fn describe_result(tool_name: &str, result: &ActionResult) -> String {
    match result.status {
        ActionStatus::Error => format!(
            "I encountered an error while trying to process your request: {}",
            result.reason().unwrap_or("unknown error")
        ),
        ActionStatus::RequiresConfirmation => format!(
            "I've prepared the transaction: {}. Please review and sign it in your wallet.",
            result.summary.as_deref().unwrap_or(tool_name)
        ),
        ActionStatus::Success => match tool_name {
            GET_PORTFOLIO => {
                let count = result.details["assets"]
                    .as_array()
                    .map(Vec::len)
                    .unwrap_or(0);
                let total = result.details["totalValueUsd"].as_f64().unwrap_or(0.0);
                format!(
                    "Your portfolio contains {} assets with a total value of ${}.",
                    count, total
                )
            }
            SEARCH_KNOWLEDGE => match result.details["fragments"]
                .as_array()
                .and_then(|f| f.first())
                .and_then(Value::as_str)
            {
                Some(fragment) => format!("Here is what I found: {}", fragment),
                None => "I couldn't find anything on that topic.".to_string(),
            },
            _ => match &result.tx_hash {
                Some(hash) => format!("Done. Transaction hash: {}", hash),
                None => "Task completed.".to_string(),
            },
        },
    }
}

#[async_trait]
impl LLMProvider for KeywordProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let Some(last) = request.messages.last() else {
            return Ok(Completion::text(FALLBACK_REPLY));
        };

        if last.role == MessageRole::Tool {
            return Ok(Completion::text(synthesize(last)));
        }

        let text = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(Message::text_content)
            .unwrap_or_default();

        Ok(self.decide(request, &text))
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "keyword".to_string(),
            model_name: "keyword-router".to_string(),
        }
    }
}

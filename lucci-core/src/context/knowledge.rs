//! Static keyword-matched knowledge base

use crate::error::{LucciError, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// Source of background knowledge fragments.
///
/// Searching never fails: an unmatched query yields a non-empty default set.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn search(&self, query: &str) -> Vec<String>;
}

/// Fragments returned when a query matches a keyword pattern
#[derive(Debug, Clone)]
pub struct KnowledgeTopic {
    pattern: Regex,
    fragments: Vec<String>,
}

impl KnowledgeTopic {
    /// Topic matched by `pattern` (case-insensitive)
    pub fn new(pattern: &str, fragments: Vec<String>) -> Result<Self> {
        let pattern = Regex::new(&format!("(?i){}", pattern)).map_err(|e| {
            LucciError::Configuration(format!("Invalid knowledge pattern '{}': {}", pattern, e))
        })?;
        Ok(Self { pattern, fragments })
    }

    pub fn matches(&self, query: &str) -> bool {
        self.pattern.is_match(query)
    }
}

const TOPIC_TABLE: &[(&str, &[&str])] = &[
    (
        r"\b(solana|jupiter)\b",
        &[
            "Jupiter is the leading liquidity aggregator on Solana.",
            "Solana transactions are fast and have low fees.",
            "To swap on Solana, you typically need SOL for gas.",
        ],
    ),
    (
        r"\b(ethereum|uniswap|base)\b",
        &[
            "Uniswap is the largest decentralized exchange on Ethereum and Base.",
            "Ethereum transactions pay gas in ETH and fees rise with network congestion.",
        ],
    ),
    (
        r"\b(bsc|pancakeswap|bnb)\b",
        &["PancakeSwap is the main decentralized exchange on BNB Smart Chain (BSC)."],
    ),
    (
        r"\bbridg(e|es|ed|ing)\b",
        &["Bridging moves assets between chains; always double-check the destination chain and address."],
    ),
    (
        r"\bslippage\b",
        &["Slippage is the gap between the quoted and the executed price; a high tolerance risks a poor fill."],
    ),
];

static BUILTIN_TOPICS: Lazy<Vec<KnowledgeTopic>> = Lazy::new(|| {
    TOPIC_TABLE
        .iter()
        .filter_map(|(pattern, fragments)| {
            KnowledgeTopic::new(pattern, fragments.iter().map(|f| f.to_string()).collect()).ok()
        })
        .collect()
});

const DEFAULT_FRAGMENTS: &[&str] = &[
    "The Lucci SDK provides a modular architecture for AI agents.",
    "Agents can manage portfolios and execute DeFi actions.",
];

/// Keyword-matched fragment sets with a default fallback
#[derive(Debug, Clone)]
pub struct StaticKnowledgeBase {
    topics: Vec<KnowledgeTopic>,
    defaults: Vec<String>,
}

impl Default for StaticKnowledgeBase {
    fn default() -> Self {
        Self {
            topics: BUILTIN_TOPICS.clone(),
            defaults: DEFAULT_FRAGMENTS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl StaticKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a topic
    pub fn with_topic(mut self, topic: KnowledgeTopic) -> Self {
        self.topics.push(topic);
        self
    }

    /// Fragments of every matching topic in declaration order, or the
    /// defaults when nothing matches
    pub fn lookup(&self, query: &str) -> Vec<String> {
        let mut fragments: Vec<String> = Vec::new();
        for topic in self.topics.iter().filter(|t| t.matches(query)) {
            for fragment in &topic.fragments {
                if !fragments.contains(fragment) {
                    fragments.push(fragment.clone());
                }
            }
        }

        if fragments.is_empty() {
            self.defaults.clone()
        } else {
            fragments
        }
    }
}

#[async_trait]
impl KnowledgeBase for StaticKnowledgeBase {
    async fn search(&self, query: &str) -> Vec<String> {
        let fragments = self.lookup(query);
        tracing::debug!(query = %query, fragments = fragments.len(), "Knowledge search");
        fragments
    }
}

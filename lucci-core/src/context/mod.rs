//! Context Provider
//!
//! Read-only access to the ambient data the agent reasons over: the user's
//! portfolio, background knowledge, and reference prices. Every lookup is
//! idempotent and the provider holds no mutable state, so one instance is
//! shared across concurrent conversations behind an `Arc`.
//!
//! # Example
//!
//! ```rust,ignore
//! use lucci_core::context::ContextProvider;
//!
//! let context = ContextProvider::mock();
//! let portfolio = context.get_portfolio("0x1234").await?;
//! let notes = context.search_knowledge("how do swaps work on solana").await;
//! ```

mod knowledge;
mod portfolio;
mod prices;

pub use knowledge::{KnowledgeBase, KnowledgeTopic, StaticKnowledgeBase};
pub use portfolio::{Asset, MockPortfolioProvider, PortfolioProvider, PortfolioSnapshot};
pub use prices::PriceTable;

use crate::error::Result;
use std::sync::Arc;

/// Placeholder used when no user address is known
pub const NO_CONTEXT: &str = "No specific context provided yet.";

/// Façade over the portfolio provider, knowledge base and price table
#[derive(Clone)]
pub struct ContextProvider {
    portfolio: Arc<dyn PortfolioProvider>,
    knowledge: Arc<dyn KnowledgeBase>,
    prices: PriceTable,
}

impl std::fmt::Debug for ContextProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextProvider")
            .field("prices", &self.prices)
            .finish_non_exhaustive()
    }
}

impl Default for ContextProvider {
    fn default() -> Self {
        Self::mock()
    }
}

impl ContextProvider {
    pub fn new(
        portfolio: Arc<dyn PortfolioProvider>,
        knowledge: Arc<dyn KnowledgeBase>,
        prices: PriceTable,
    ) -> Self {
        Self {
            portfolio,
            knowledge,
            prices,
        }
    }

    /// Mock portfolio, static knowledge base and default prices
    pub fn mock() -> Self {
        Self::new(
            Arc::new(MockPortfolioProvider::new()),
            Arc::new(StaticKnowledgeBase::new()),
            PriceTable::default(),
        )
    }

    pub fn with_portfolio_provider(mut self, provider: Arc<dyn PortfolioProvider>) -> Self {
        self.portfolio = provider;
        self
    }

    pub fn with_knowledge_base(mut self, knowledge: Arc<dyn KnowledgeBase>) -> Self {
        self.knowledge = knowledge;
        self
    }

    pub fn with_prices(mut self, prices: PriceTable) -> Self {
        self.prices = prices;
        self
    }

    /// Holdings of `address`
    pub async fn get_portfolio(&self, address: &str) -> Result<PortfolioSnapshot> {
        self.portfolio.get_portfolio(address).await
    }

    /// Knowledge fragments relevant to `query`; never empty
    pub async fn search_knowledge(&self, query: &str) -> Vec<String> {
        self.knowledge.search(query).await
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    /// Render the context block for the system prompt.
    ///
    /// A failed portfolio lookup degrades to a note instead of failing the
    /// turn.
    pub async fn describe_for_prompt(&self, address: Option<&str>) -> String {
        let Some(address) = address.map(str::trim).filter(|a| !a.is_empty()) else {
            return NO_CONTEXT.to_string();
        };

        match self.get_portfolio(address).await {
            Ok(snapshot) => format!("User Address: {}\n{}", address, snapshot.summary()),
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Portfolio lookup failed");
                format!("User Address: {}\nPortfolio: unavailable", address)
            }
        }
    }
}

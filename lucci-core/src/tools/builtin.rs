//! Built-in read-only tools backed by the Context Provider

use super::capability::Capability;
use super::result::{ActionResult, ToolError};
use super::schema::{ArgSchema, FieldSpec, ValidatedArgs};
use crate::context::ContextProvider;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub const GET_PORTFOLIO: &str = "get_portfolio";
pub const SEARCH_KNOWLEDGE: &str = "search_knowledge";

/// Names no registered capability may use
pub const BUILTIN_TOOL_NAMES: [&str; 2] = [GET_PORTFOLIO, SEARCH_KNOWLEDGE];

/// Fetches a wallet's holdings
pub struct GetPortfolioTool {
    context: Arc<ContextProvider>,
    schema: ArgSchema,
}

impl GetPortfolioTool {
    pub fn new(context: Arc<ContextProvider>) -> Self {
        Self {
            context,
            schema: ArgSchema::new().field(
                FieldSpec::string("address")
                    .non_empty()
                    .describe("The user wallet address"),
            ),
        }
    }
}

#[async_trait]
impl Capability for GetPortfolioTool {
    fn capability_type(&self) -> &str {
        GET_PORTFOLIO
    }

    fn description(&self) -> &str {
        "Fetches the portfolio assets for a given user address."
    }

    fn schema(&self) -> &ArgSchema {
        &self.schema
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<ActionResult, ToolError> {
        let address = args.str("address").unwrap_or_default();
        let snapshot = self
            .context
            .get_portfolio(address)
            .await
            .map_err(|e| ToolError::execution(e.to_string()))?;
        let details =
            serde_json::to_value(&snapshot).map_err(|e| ToolError::execution(e.to_string()))?;
        Ok(ActionResult::success(GET_PORTFOLIO, details))
    }
}

/// Searches the knowledge base
pub struct SearchKnowledgeTool {
    context: Arc<ContextProvider>,
    schema: ArgSchema,
}

impl SearchKnowledgeTool {
    pub fn new(context: Arc<ContextProvider>) -> Self {
        Self {
            context,
            schema: ArgSchema::new().field(FieldSpec::string("query").describe("The search query")),
        }
    }
}

#[async_trait]
impl Capability for SearchKnowledgeTool {
    fn capability_type(&self) -> &str {
        SEARCH_KNOWLEDGE
    }

    fn description(&self) -> &str {
        "Searches the knowledge base for information about protocols, concepts, or static data."
    }

    fn schema(&self) -> &ArgSchema {
        &self.schema
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<ActionResult, ToolError> {
        let query = args.str("query").unwrap_or_default();
        let fragments = self.context.search_knowledge(query).await;
        Ok(ActionResult::success(
            SEARCH_KNOWLEDGE,
            json!({ "query": query, "fragments": fragments }),
        ))
    }
}

/// The built-in tools, in listing order
pub fn builtin_tools(context: Arc<ContextProvider>) -> Vec<Arc<dyn Capability>> {
    vec![
        Arc::new(GetPortfolioTool::new(context.clone())),
        Arc::new(SearchKnowledgeTool::new(context)),
    ]
}

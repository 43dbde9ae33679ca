//! Token swap preparation

use super::{ProtocolRouting, estimated_fee, mock_unsigned_tx, round_amount};
use crate::context::ContextProvider;
use crate::tools::{ActionResult, ArgSchema, Capability, FieldSpec, ToolError, ValidatedArgs};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const SWAP: &str = "swap";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapArgs {
    token_in: String,
    token_out: String,
    amount: f64,
    chain: String,
    protocol: Option<String>,
}

/// Prepares a token swap for the user to sign
pub struct Swap {
    routing: ProtocolRouting,
    context: Arc<ContextProvider>,
    schema: ArgSchema,
}

impl Swap {
    pub fn new(routing: ProtocolRouting, context: Arc<ContextProvider>) -> Self {
        let schema = ArgSchema::new()
            .field(
                FieldSpec::string("tokenIn")
                    .non_empty()
                    .describe("The token symbol to sell (e.g., SOL)"),
            )
            .field(
                FieldSpec::string("tokenOut")
                    .non_empty()
                    .describe("The token symbol to buy (e.g., USDC)"),
            )
            .field(
                FieldSpec::number("amount")
                    .positive()
                    .describe("The amount of tokenIn to swap"),
            )
            .field(
                FieldSpec::string("chain")
                    .with_default("solana")
                    .describe("The blockchain network"),
            )
            .field(
                FieldSpec::string("protocol")
                    .optional()
                    .describe("Specific protocol (e.g., jupiter)"),
            );

        Self {
            routing,
            context,
            schema,
        }
    }

    pub fn routing(&self) -> &ProtocolRouting {
        &self.routing
    }
}

#[async_trait]
impl Capability for Swap {
    fn capability_type(&self) -> &str {
        SWAP
    }

    fn description(&self) -> &str {
        "Prepare a token swap transaction. This tool returns a transaction that must be signed by the user wallet."
    }

    fn schema(&self) -> &ArgSchema {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<ActionResult, ToolError> {
        let args: SwapArgs = args
            .parse()
            .map_err(|e| ToolError::execution(format!("malformed swap arguments: {}", e)))?;
        let chain = args.chain.to_lowercase();

        if args.token_in.eq_ignore_ascii_case(&args.token_out) {
            return Ok(ActionResult::error(SWAP, "tokenIn and tokenOut must differ"));
        }

        let protocol = match args
            .protocol
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| self.routing.resolve(&chain))
        {
            Some(protocol) => protocol.to_string(),
            None => {
                tracing::info!(chain = %chain, "Swap requested on unsupported chain");
                return Ok(ActionResult::error(
                    SWAP,
                    format!("unsupported chain: {}", chain),
                ));
            }
        };

        let estimated_out = self
            .context
            .prices()
            .quote(&args.token_in, &args.token_out, args.amount)
            .map(round_amount);

        tracing::info!(
            chain = %chain,
            protocol = %protocol,
            token_in = %args.token_in,
            token_out = %args.token_out,
            amount = args.amount,
            "Preparing swap"
        );

        let details = json!({
            "chain": chain,
            "tokenIn": args.token_in,
            "tokenOut": args.token_out,
            "amount": args.amount,
            "protocol": protocol,
            "estimatedOut": estimated_out,
            "estimatedFee": estimated_fee(&chain),
        });

        let summary = match estimated_out {
            Some(out) => format!(
                "Swap {} {} for approximately {} {}",
                args.amount, args.token_in, out, args.token_out
            ),
            None => format!(
                "Swap {} {} for {} at the market rate",
                args.amount, args.token_in, args.token_out
            ),
        };

        Ok(ActionResult::requires_confirmation(
            SWAP,
            mock_unsigned_tx(&details),
            summary,
            details,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn swap() -> Swap {
        Swap::new(ProtocolRouting::default(), Arc::new(ContextProvider::mock()))
    }

    async fn run(swap: &Swap, raw: Value) -> ActionResult {
        let args = swap.validate(&raw).unwrap();
        swap.execute(args).await.unwrap()
    }

    #[tokio::test]
    async fn test_solana_routes_to_jupiter() {
        let result = run(
            &swap(),
            json!({"tokenIn": "SOL", "tokenOut": "USDC", "amount": 1, "chain": "solana"}),
        )
        .await;

        assert!(result.requires_user_confirmation());
        assert_eq!(result.details["protocol"], "jupiter");
        assert!(result.unsigned_tx.is_some());
        assert_eq!(
            result.summary.as_deref(),
            Some("Swap 1 SOL for approximately 100 USDC")
        );
    }

    #[tokio::test]
    async fn test_chain_defaults_to_solana() {
        let result = run(&swap(), json!({"tokenIn": "SOL", "tokenOut": "USDC", "amount": 2})).await;
        assert_eq!(result.details["chain"], "solana");
        assert_eq!(result.details["estimatedFee"], "0.000005 SOL");
    }

    #[tokio::test]
    async fn test_ethereum_routes_to_uniswap() {
        let result = run(
            &swap(),
            json!({"tokenIn": "ETH", "tokenOut": "USDC", "amount": 1, "chain": "ethereum"}),
        )
        .await;

        assert!(result.requires_user_confirmation());
        assert_eq!(result.details["protocol"], "uniswap");
    }

    #[tokio::test]
    async fn test_explicit_protocol_wins() {
        let result = run(
            &swap(),
            json!({"tokenIn": "SOL", "tokenOut": "JUP", "amount": 1, "protocol": "raydium"}),
        )
        .await;
        assert_eq!(result.details["protocol"], "raydium");
    }

    #[tokio::test]
    async fn test_unsupported_chain_is_business_error() {
        let result = run(
            &swap(),
            json!({"tokenIn": "TRX", "tokenOut": "USDT", "amount": 1, "chain": "tron"}),
        )
        .await;

        assert!(result.is_error());
        assert_eq!(result.reason(), Some("unsupported chain: tron"));
    }

    #[tokio::test]
    async fn test_fallback_protocol_for_unknown_chain() {
        let swap = Swap::new(
            ProtocolRouting::default().with_fallback("0x"),
            Arc::new(ContextProvider::mock()),
        );
        let result = run(
            &swap,
            json!({"tokenIn": "ETH", "tokenOut": "USDC", "amount": 1, "chain": "arbitrum"}),
        )
        .await;
        assert_eq!(result.details["protocol"], "0x");
    }

    #[tokio::test]
    async fn test_unknown_price_uses_market_rate_summary() {
        let result = run(
            &swap(),
            json!({"tokenIn": "SOL", "tokenOut": "WIF", "amount": 1}),
        )
        .await;
        assert!(result.summary.unwrap().contains("at the market rate"));
        assert!(result.details["estimatedOut"].is_null());
    }

    #[tokio::test]
    async fn test_identical_tokens_rejected() {
        let result = run(&swap(), json!({"tokenIn": "SOL", "tokenOut": "sol", "amount": 1})).await;
        assert!(result.is_error());
    }

    #[test]
    fn test_negative_amount_violation() {
        let errors = swap()
            .validate(&json!({"tokenIn": "SOL", "tokenOut": "USDC", "amount": -1}))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "amount");
    }
}

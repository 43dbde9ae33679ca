//! Asset transfer preparation

use super::{estimated_fee, mock_unsigned_tx};
use crate::tools::{ActionResult, ArgSchema, Capability, FieldSpec, ToolError, ValidatedArgs};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const TRANSFER: &str = "transfer";

/// Chains transfers are prepared for unless configured otherwise
pub const DEFAULT_TRANSFER_CHAINS: [&str; 4] = ["ethereum", "solana", "base", "bsc"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferArgs {
    to_address: String,
    token: String,
    amount: f64,
    chain: String,
}

/// Prepares a native or token transfer for the user to sign
pub struct Transfer {
    supported_chains: Vec<String>,
    schema: ArgSchema,
}

impl Default for Transfer {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSFER_CHAINS.iter().map(|c| c.to_string()))
    }
}

impl Transfer {
    pub fn new(supported_chains: impl IntoIterator<Item = String>) -> Self {
        let schema = ArgSchema::new()
            .field(
                FieldSpec::string("toAddress")
                    .non_empty()
                    .describe("The destination wallet address"),
            )
            .field(
                FieldSpec::string("token")
                    .non_empty()
                    .describe("The token symbol to send (e.g., ETH, USDC)"),
            )
            .field(
                FieldSpec::number("amount")
                    .positive()
                    .describe("The amount to transfer"),
            )
            .field(
                FieldSpec::string("chain")
                    .non_empty()
                    .describe("The blockchain network (e.g., ethereum, solana)"),
            );

        Self {
            supported_chains: supported_chains
                .into_iter()
                .map(|c| c.to_lowercase())
                .collect(),
            schema,
        }
    }

    pub fn supported_chains(&self) -> &[String] {
        &self.supported_chains
    }
}

#[async_trait]
impl Capability for Transfer {
    fn capability_type(&self) -> &str {
        TRANSFER
    }

    fn description(&self) -> &str {
        "Sends crypto assets from the user wallet to another address. This tool returns a transaction that must be signed by the user wallet."
    }

    fn schema(&self) -> &ArgSchema {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<ActionResult, ToolError> {
        let args: TransferArgs = args
            .parse()
            .map_err(|e| ToolError::execution(format!("malformed transfer arguments: {}", e)))?;
        let chain = args.chain.to_lowercase();

        if !self.supported_chains.contains(&chain) {
            return Ok(ActionResult::error(
                TRANSFER,
                format!("unsupported chain: {}", chain),
            ));
        }

        tracing::info!(
            chain = %chain,
            token = %args.token,
            amount = args.amount,
            "Preparing transfer"
        );

        let details = json!({
            "chain": chain,
            "to": args.to_address,
            "asset": args.token,
            "amount": args.amount,
            "estimatedFee": estimated_fee(&chain),
        });
        let summary = format!(
            "Send {} {} to {} on {}",
            args.amount, args.token, args.to_address, chain
        );

        Ok(ActionResult::requires_confirmation(
            TRANSFER,
            mock_unsigned_tx(&details),
            summary,
            details,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transfer_requires_confirmation() {
        let transfer = Transfer::default();
        let args = transfer
            .validate(&json!({
                "toAddress": "0xBEEF",
                "token": "USDC",
                "amount": 25,
                "chain": "Base"
            }))
            .unwrap();
        let result = transfer.execute(args).await.unwrap();

        assert!(result.requires_user_confirmation());
        assert!(result.tx_hash.is_none());
        assert_eq!(result.details["chain"], "base");
        assert_eq!(result.details["to"], "0xBEEF");
        assert_eq!(result.summary.as_deref(), Some("Send 25 USDC to 0xBEEF on base"));
    }

    #[tokio::test]
    async fn test_unsupported_chain() {
        let transfer = Transfer::new(vec!["solana".to_string()]);
        let args = transfer
            .validate(&json!({"toAddress": "x", "token": "ETH", "amount": 1, "chain": "ethereum"}))
            .unwrap();
        let result = transfer.execute(args).await.unwrap();

        assert!(result.is_error());
        assert_eq!(result.reason(), Some("unsupported chain: ethereum"));
    }

    #[test]
    fn test_all_fields_required() {
        let errors = Transfer::default().validate(&json!({})).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().all(|e| e.code == "required"));
    }
}

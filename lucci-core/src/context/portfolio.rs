//! Portfolio snapshots and providers

use crate::error::{LucciError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single holding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub symbol: String,
    pub amount: f64,
    pub value_usd: f64,
    pub chain: String,
}

/// Holdings of one wallet address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub address: String,
    pub total_value_usd: f64,
    pub assets: Vec<Asset>,
}

impl PortfolioSnapshot {
    /// Build a snapshot whose total is the sum of its assets
    pub fn new(address: impl Into<String>, assets: Vec<Asset>) -> Self {
        let total_value_usd = assets.iter().map(|a| a.value_usd).sum();
        Self {
            address: address.into(),
            total_value_usd,
            assets,
        }
    }

    /// One-line-per-asset summary for prompts
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Portfolio Value: ${:.2}", self.total_value_usd)];
        lines.extend(self.assets.iter().map(|a| {
            format!(
                "- {} {} on {} (${:.2})",
                a.amount, a.symbol, a.chain, a.value_usd
            )
        }));
        lines.join("\n")
    }
}

/// Source of portfolio data
#[async_trait]
pub trait PortfolioProvider: Send + Sync {
    async fn get_portfolio(&self, address: &str) -> Result<PortfolioSnapshot>;
}

/// Fixed holdings returned for every address
#[derive(Debug, Clone)]
pub struct MockPortfolioProvider {
    assets: Vec<Asset>,
}

impl Default for MockPortfolioProvider {
    fn default() -> Self {
        Self {
            assets: vec![
                Asset {
                    symbol: "SOL".to_string(),
                    amount: 145.5,
                    value_usd: 14550.0,
                    chain: "solana".to_string(),
                },
                Asset {
                    symbol: "USDC".to_string(),
                    amount: 880.5,
                    value_usd: 880.5,
                    chain: "solana".to_string(),
                },
            ],
        }
    }
}

impl MockPortfolioProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the holdings
    pub fn with_assets(assets: Vec<Asset>) -> Self {
        Self { assets }
    }
}

#[async_trait]
impl PortfolioProvider for MockPortfolioProvider {
    async fn get_portfolio(&self, address: &str) -> Result<PortfolioSnapshot> {
        if address.is_empty() {
            return Err(LucciError::InvalidInput(
                "wallet address must not be empty".to_string(),
            ));
        }
        let trimmed = address.trim();
        let address = if trimmed.is_empty() { address } else { trimmed };
        Ok(PortfolioSnapshot::new(address, self.assets.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_portfolio_shape() {
        let provider = MockPortfolioProvider::new();
        let snapshot = provider.get_portfolio("0xabc").await.unwrap();

        assert_eq!(snapshot.address, "0xabc");
        assert_eq!(snapshot.assets.len(), 2);
        assert!((snapshot.total_value_usd - 15430.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_empty_address_rejected() {
        let provider = MockPortfolioProvider::new();
        let err = provider.get_portfolio("").await.unwrap_err();
        assert!(matches!(err, LucciError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_any_non_empty_address_gets_snapshot() {
        let provider = MockPortfolioProvider::new();

        let padded = provider.get_portfolio("  0xabc \n").await.unwrap();
        assert_eq!(padded.address, "0xabc");

        let blank = provider.get_portfolio("  ").await.unwrap();
        assert_eq!(blank.address, "  ");
        assert!(!blank.assets.is_empty());
        assert!(blank.total_value_usd > 0.0);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let snapshot = PortfolioSnapshot::new("0xabc", Vec::new());
        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value.get("totalValueUsd").is_some());
    }

    #[test]
    fn test_summary() {
        let snapshot = PortfolioSnapshot::new(
            "0xabc",
            vec![Asset {
                symbol: "SOL".to_string(),
                amount: 2.0,
                value_usd: 200.0,
                chain: "solana".to_string(),
            }],
        );
        let summary = snapshot.summary();
        assert!(summary.contains("Portfolio Value: $200.00"));
        assert!(summary.contains("- 2 SOL on solana ($200.00)"));
    }
}

//! Mock USD price table

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Symbol to USD price lookup used for quotes and valuations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    prices: HashMap<String, f64>,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::new()
            .with_price("SOL", 100.0)
            .with_price("USDC", 1.0)
            .with_price("USDT", 1.0)
            .with_price("ETH", 3200.0)
            .with_price("WETH", 3200.0)
            .with_price("BNB", 580.0)
            .with_price("JUP", 0.9)
            .with_price("BONK", 0.000025)
    }
}

impl PriceTable {
    /// Empty table
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
        }
    }

    pub fn with_price(mut self, symbol: impl Into<String>, usd: f64) -> Self {
        self.prices.insert(symbol.into().to_uppercase(), usd);
        self
    }

    /// USD price of `symbol`, case-insensitive
    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(&symbol.to_uppercase()).copied()
    }

    /// Amount of `token_out` received for `amount` of `token_in`
    pub fn quote(&self, token_in: &str, token_out: &str, amount: f64) -> Option<f64> {
        let price_in = self.price(token_in)?;
        let price_out = self.price(token_out).filter(|p| *p > 0.0)?;
        Some(amount * price_in / price_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        let prices = PriceTable::default();
        assert_eq!(prices.quote("SOL", "USDC", 2.0), Some(200.0));
        assert_eq!(prices.quote("sol", "usdc", 1.0), Some(100.0));
        assert_eq!(prices.quote("SOL", "NOPE", 1.0), None);
    }
}

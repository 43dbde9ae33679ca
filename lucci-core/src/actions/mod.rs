//! Mutating DeFi actions
//!
//! Actions never touch a chain. They prepare a mock unsigned transaction and
//! return it with `requires_confirmation` so the user's wallet can sign it.

mod routing;
mod swap;
mod transfer;

pub use routing::ProtocolRouting;
pub use swap::Swap;
pub use transfer::{DEFAULT_TRANSFER_CHAINS, Transfer};

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Deterministic stand-in for a serialized transaction
pub(crate) fn mock_unsigned_tx(payload: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Typical network fee, as shown to the user
pub(crate) fn estimated_fee(chain: &str) -> &'static str {
    match chain {
        "solana" => "0.000005 SOL",
        "ethereum" => "0.0015 ETH",
        "base" => "0.00002 ETH",
        "bsc" => "0.0003 BNB",
        _ => "unknown",
    }
}

/// Round to six decimal places for display
pub(crate) fn round_amount(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mock_unsigned_tx_is_deterministic() {
        let a = mock_unsigned_tx(&json!({"amount": 1}));
        let b = mock_unsigned_tx(&json!({"amount": 1}));
        let c = mock_unsigned_tx(&json!({"amount": 2}));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_round_amount() {
        assert_eq!(round_amount(100.0 / 3.0), 33.333333);
    }
}

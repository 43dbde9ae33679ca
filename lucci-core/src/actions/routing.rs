//! Chain to protocol routing table

use crate::error::{LucciError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_routes() -> BTreeMap<String, String> {
    [
        ("solana", "jupiter"),
        ("ethereum", "uniswap"),
        ("base", "uniswap"),
        ("bsc", "pancakeswap"),
    ]
    .into_iter()
    .map(|(chain, protocol)| (chain.to_string(), protocol.to_string()))
    .collect()
}

/// Chain names are matched case-insensitively, so keys are stored lower-case
fn lowercase_chains<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let routes = BTreeMap::<String, String>::deserialize(deserializer)?;
    Ok(routes
        .into_iter()
        .map(|(chain, protocol)| (chain.to_lowercase(), protocol))
        .collect())
}

/// Default swap protocol per chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolRouting {
    /// Lower-case chain name to protocol
    #[serde(default = "default_routes", deserialize_with = "lowercase_chains")]
    pub routes: BTreeMap<String, String>,

    /// Protocol for chains missing from `routes`; `None` rejects them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl Default for ProtocolRouting {
    fn default() -> Self {
        Self {
            routes: default_routes(),
            fallback: None,
        }
    }
}

impl ProtocolRouting {
    /// Table with no routes and no fallback
    pub fn empty() -> Self {
        Self {
            routes: BTreeMap::new(),
            fallback: None,
        }
    }

    pub fn with_route(mut self, chain: impl Into<String>, protocol: impl Into<String>) -> Self {
        self.routes
            .insert(chain.into().to_lowercase(), protocol.into());
        self
    }

    pub fn with_fallback(mut self, protocol: impl Into<String>) -> Self {
        self.fallback = Some(protocol.into());
        self
    }

    /// Protocol for `chain`, case-insensitive
    pub fn resolve(&self, chain: &str) -> Option<&str> {
        self.routes
            .get(&chain.to_lowercase())
            .or(self.fallback.as_ref())
            .map(String::as_str)
    }

    /// Chains with an explicit route
    pub fn chains(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Reject empty chain or protocol names
    pub fn validate(&self) -> Result<()> {
        for (chain, protocol) in &self.routes {
            if chain.trim().is_empty() || protocol.trim().is_empty() {
                return Err(LucciError::Configuration(format!(
                    "Invalid route '{}' -> '{}': chain and protocol must not be empty",
                    chain, protocol
                )));
            }
        }
        if self.fallback.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(LucciError::Configuration(
                "Fallback protocol must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

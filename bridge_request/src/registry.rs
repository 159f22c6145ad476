//! Token and deployment tables.
//!
//! A `BuilderConfig` is plain TOML:
//!
//! ```toml
//! [[tokens]]
//! symbol = "USDC"
//! chain_id = 8453
//! address = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
//! decimals = 6
//!
//! [[deployments]]
//! chain_id = 8453
//! distributor = "0x..."
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RequestError, Result};

const BUILTIN_TOKENS: &str = include_str!("tokens.toml");

/// ERC-20 token on one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub chain_id: u64,
    pub address: String,
    pub decimals: u8,
}

/// Distributor contract deployed on one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub chain_id: u64,
    pub distributor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    #[serde(default)]
    pub tokens: Vec<TokenInfo>,
    #[serde(default)]
    pub deployments: Vec<Deployment>,
}

impl BuilderConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read a config file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(
            path = %path.display(),
            tokens = config.tokens.len(),
            deployments = config.deployments.len(),
            "loaded builder config"
        );
        Ok(config)
    }

    /// Token table shipped with the crate. Contains no deployments.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TOKENS)
    }

    /// Layer `other` on top of `self`. Entries in `other` replace entries
    /// for the same token symbol and chain, or the same deployment chain.
    pub fn merge(mut self, other: BuilderConfig) -> Self {
        for token in other.tokens {
            self.tokens.retain(|t| {
                !(t.chain_id == token.chain_id && t.symbol.eq_ignore_ascii_case(&token.symbol))
            });
            self.tokens.push(token);
        }
        for deployment in other.deployments {
            self.deployments
                .retain(|d| d.chain_id != deployment.chain_id);
            self.deployments.push(deployment);
        }
        self
    }
}

/// Lookup tables built from a validated `BuilderConfig`.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    tokens: HashMap<(u64, String), TokenInfo>,
    deployments: HashMap<u64, String>,
}

impl TokenRegistry {
    pub fn from_config(config: &BuilderConfig) -> Result<Self> {
        let mut tokens = HashMap::new();
        for token in &config.tokens {
            check_address(&token.address)?;
            let key = (token.chain_id, token.symbol.to_ascii_uppercase());
            if tokens.insert(key, token.clone()).is_some() {
                return Err(RequestError::DuplicateToken {
                    symbol: token.symbol.clone(),
                    chain_id: token.chain_id,
                });
            }
        }

        let mut deployments = HashMap::new();
        for deployment in &config.deployments {
            check_address(&deployment.distributor)?;
            deployments.insert(deployment.chain_id, deployment.distributor.clone());
        }

        Ok(Self {
            tokens,
            deployments,
        })
    }

    /// Resolve a token symbol (case-insensitive) on a chain.
    pub fn token(&self, symbol: &str, chain_id: u64) -> Result<&TokenInfo> {
        self.tokens
            .get(&(chain_id, symbol.to_ascii_uppercase()))
            .ok_or_else(|| {
                warn!(symbol, chain_id, "token not in registry");
                RequestError::UnknownToken {
                    symbol: symbol.to_string(),
                    chain_id,
                }
            })
    }

    pub fn distributor(&self, chain_id: u64) -> Result<&str> {
        self.deployments
            .get(&chain_id)
            .map(String::as_str)
            .ok_or(RequestError::NoDeployment(chain_id))
    }

    /// Tokens known on `chain_id`, sorted by symbol.
    pub fn tokens_on(&self, chain_id: u64) -> Vec<&TokenInfo> {
        let mut found: Vec<&TokenInfo> = self
            .tokens
            .values()
            .filter(|t| t.chain_id == chain_id)
            .collect();
        found.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        found
    }
}

/// Accept `0x` followed by exactly 40 hex digits, any case.
pub fn check_address(address: &str) -> Result<()> {
    let valid = address
        .strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(RequestError::InvalidAddress(address.to_string()))
    }
}

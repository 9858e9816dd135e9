//! Blockscout explorer client for wallet token balances.
//!
//! One client serves every configured chain; each chain is addressed by its
//! Blockscout base URL. Balances come back as raw integer strings and are
//! scaled by token decimals before they reach the core.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

/// A single token balance held by a wallet on one chain.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenHolding {
    /// Token symbol as reported by the explorer (e.g., "aEthWETH")
    pub symbol: String,
    /// Token contract address
    pub address: Address,
    /// Balance scaled by token decimals
    pub balance: f64,
    /// Token decimals
    pub decimals: u8,
}

/// Point-in-time token balances for a wallet on a single chain.
///
/// Source of truth for remediation-action feasibility checks.
#[derive(Debug, Clone, Default)]
pub struct HoldingsSnapshot {
    /// Chain ID
    pub chain_id: u64,
    /// Human-readable chain name
    pub chain_name: String,
    /// Token balances on this chain
    pub tokens: Vec<TokenHolding>,
}

impl HoldingsSnapshot {
    /// Wallet balance of `symbol` on this chain (0.0 when not held).
    pub fn balance_of(&self, symbol: &str) -> f64 {
        self.tokens
            .iter()
            .filter(|t| t.symbol.eq_ignore_ascii_case(symbol))
            .map(|t| t.balance)
            .sum()
    }
}

/// Explorer endpoint for one chain.
#[derive(Debug, Clone)]
pub struct ChainEndpoint {
    /// Chain ID
    pub chain_id: u64,
    /// Human-readable chain name
    pub chain_name: String,
    /// Blockscout API base URL (e.g., "https://eth-sepolia.blockscout.com/api/v2")
    pub base_url: String,
}

/// Source of wallet token balances per chain.
///
/// The monitor depends on this seam rather than the concrete HTTP client,
/// so chain-level failures can be exercised without a live explorer.
#[async_trait]
pub trait HoldingsSource: Send + Sync {
    async fn tokens_by_address(
        &self,
        address: Address,
        endpoint: &ChainEndpoint,
    ) -> Result<HoldingsSnapshot>;
}

/// Blockscout REST API client.
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    client: reqwest::Client,
}

impl ExplorerClient {
    /// Create a new explorer client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HoldingsSource for ExplorerClient {
    /// Fetch all token balances for `address` on the chain behind `endpoint`.
    ///
    /// Entries the explorer reports without a parseable contract address or
    /// balance are skipped rather than failing the whole snapshot.
    #[instrument(skip(self, endpoint), fields(chain = endpoint.chain_id))]
    async fn tokens_by_address(
        &self,
        address: Address,
        endpoint: &ChainEndpoint,
    ) -> Result<HoldingsSnapshot> {
        let url = format!(
            "{}/addresses/{}/token-balances",
            endpoint.base_url.trim_end_matches('/'),
            address
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("explorer request failed for chain {}", endpoint.chain_id))?
            .error_for_status()
            .with_context(|| format!("explorer returned error for chain {}", endpoint.chain_id))?;

        let entries: Vec<TokenBalanceEntry> = response
            .json()
            .await
            .with_context(|| format!("invalid explorer payload for chain {}", endpoint.chain_id))?;

        let mut tokens = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.into_holding() {
                Some(holding) => tokens.push(holding),
                None => warn!(chain = endpoint.chain_id, "Skipping unparseable token balance"),
            }
        }

        debug!(
            chain = endpoint.chain_id,
            tokens = tokens.len(),
            "Fetched token balances"
        );

        Ok(HoldingsSnapshot {
            chain_id: endpoint.chain_id,
            chain_name: endpoint.chain_name.clone(),
            tokens,
        })
    }
}

impl Default for ExplorerClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw token balance entry from the Blockscout v2 API.
#[derive(Debug, Deserialize)]
struct TokenBalanceEntry {
    token: TokenInfo,
    /// Raw balance in base units (integer string)
    value: String,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    address: String,
    symbol: Option<String>,
    /// Decimals come back as a string, or null for odd tokens
    decimals: Option<String>,
}

impl TokenBalanceEntry {
    /// Convert a wire entry into a scaled holding. Returns None for entries
    /// missing a symbol or with an unparseable address/balance.
    fn into_holding(self) -> Option<TokenHolding> {
        let symbol = self.token.symbol.filter(|s| !s.is_empty())?;
        let address: Address = self.token.address.parse().ok()?;
        let decimals: u8 = self
            .token
            .decimals
            .as_deref()
            .and_then(|d| d.parse().ok())
            .unwrap_or(18);
        let raw: f64 = self.value.parse().ok()?;
        let balance = raw / 10f64.powi(decimals as i32);

        Some(TokenHolding {
            symbol,
            address,
            balance,
            decimals,
        })
    }
}

//! USD price retrieval for health factor evaluation.
//!
//! Prices come from the CoinGecko simple-price endpoint in one batched
//! request per evaluation. Tokens the API does not know fall back to a
//! static table; tokens missing from both are simply absent from the
//! snapshot and degrade to a zero price in the engine.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Mapping from token symbol to USD price, valid for a single evaluation.
///
/// Never cached inside the engine; callers build a fresh snapshot per cycle.
#[derive(Debug, Clone, Default)]
pub struct PriceSnapshot {
    prices: HashMap<String, f64>,
}

impl PriceSnapshot {
    /// Build a snapshot from (symbol, price) pairs. Symbols are uppercased.
    pub fn new(pairs: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            prices: pairs
                .into_iter()
                .map(|(symbol, price)| (symbol.to_uppercase(), price))
                .collect(),
        }
    }

    /// USD price for `symbol`, if known.
    pub fn usd(&self, symbol: &str) -> Option<f64> {
        self.prices.get(&symbol.to_uppercase()).copied()
    }

    /// Insert or overwrite a price.
    pub fn set(&mut self, symbol: &str, price: f64) {
        self.prices.insert(symbol.to_uppercase(), price);
    }

    /// Number of priced tokens.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Whether the snapshot has no prices at all.
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Symbol -> CoinGecko ID for the assets the protocol lists.
const COINGECKO_IDS: &[(&str, &str)] = &[
    ("ETH", "ethereum"),
    ("WETH", "ethereum"),
    ("USDC", "usd-coin"),
    ("USDT", "tether"),
    ("DAI", "dai"),
    ("WBTC", "wrapped-bitcoin"),
    ("LINK", "chainlink"),
    ("UNI", "uniswap"),
    ("AAVE", "aave"),
    ("CBETH", "coinbase-wrapped-staked-eth"),
    ("STETH", "staked-ether"),
    ("RETH", "rocket-pool-eth"),
    ("WSTETH", "wrapped-steth"),
];

/// Last-resort prices when the API has no quote for a token.
const FALLBACK_PRICES: &[(&str, f64)] = &[
    ("ETH", 3000.0),
    ("WETH", 3000.0),
    ("USDC", 1.0),
    ("USDT", 1.0),
    ("DAI", 1.0),
    ("WBTC", 45000.0),
    ("LINK", 15.0),
    ("UNI", 7.0),
    ("AAVE", 100.0),
    ("CBETH", 3000.0),
    ("STETH", 3000.0),
    ("RETH", 3000.0),
    ("WSTETH", 3000.0),
];

/// Source of USD price snapshots.
///
/// Seam for the monitor; a stub can stand in for the live API in tests.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn snapshot(&self, symbols: &[String]) -> Result<PriceSnapshot>;
}

/// CoinGecko price client.
#[derive(Debug, Clone)]
pub struct PriceClient {
    client: reqwest::Client,
    base_url: String,
}

impl PriceClient {
    /// Create a new price client against the public CoinGecko API.
    pub fn new() -> Self {
        Self::with_base_url("https://api.coingecko.com/api/v3")
    }

    /// Create a client with a custom base URL (tests, proxies).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn fetch_simple_prices(&self, ids: &[&str]) -> Result<HashMap<String, f64>> {
        let url = format!("{}/simple/price", self.base_url);

        let response: HashMap<String, HashMap<String, f64>> = self
            .client
            .get(&url)
            .query(&[("ids", ids.join(",")), ("vs_currencies", "usd".to_string())])
            .send()
            .await
            .context("price request failed")?
            .error_for_status()
            .context("price API returned error")?
            .json()
            .await
            .context("invalid price payload")?;

        Ok(response
            .into_iter()
            .filter_map(|(id, quote)| quote.get("usd").map(|p| (id, *p)))
            .collect())
    }
}

#[async_trait]
impl PriceSource for PriceClient {
    /// Fetch USD prices for `symbols` in one batched request.
    ///
    /// Symbols without a CoinGecko ID or missing from the response take the
    /// static fallback price when one exists; otherwise they stay absent and
    /// the engine treats them as worth zero.
    #[instrument(skip(self, symbols))]
    async fn snapshot(&self, symbols: &[String]) -> Result<PriceSnapshot> {
        let mut snapshot = PriceSnapshot::default();

        let ids: Vec<&str> = symbols
            .iter()
            .filter_map(|s| coingecko_id(s))
            .collect();

        if !ids.is_empty() {
            match self.fetch_simple_prices(&ids).await {
                Ok(by_id) => {
                    for symbol in symbols {
                        if let Some(price) =
                            coingecko_id(symbol).and_then(|id| by_id.get(id)).copied()
                        {
                            snapshot.set(symbol, price);
                        }
                    }
                }
                Err(e) => warn!(error = %e, "Price fetch failed, falling back to static prices"),
            }
        }

        for symbol in symbols {
            if snapshot.usd(symbol).is_none() {
                if let Some(price) = fallback_price(symbol) {
                    warn!(symbol = %symbol, price, "Using fallback price");
                    snapshot.set(symbol, price);
                }
            }
        }

        debug!(requested = symbols.len(), priced = snapshot.len(), "Built price snapshot");
        Ok(snapshot)
    }
}

impl Default for PriceClient {
    fn default() -> Self {
        Self::new()
    }
}

fn coingecko_id(symbol: &str) -> Option<&'static str> {
    let upper = symbol.to_uppercase();
    COINGECKO_IDS
        .iter()
        .find(|(s, _)| *s == upper)
        .map(|(_, id)| *id)
}

fn fallback_price(symbol: &str) -> Option<f64> {
    let upper = symbol.to_uppercase();
    FALLBACK_PRICES
        .iter()
        .find(|(s, _)| *s == upper)
        .map(|(_, p)| *p)
}

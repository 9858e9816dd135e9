//! Deterministic lending-position parser.
//!
//! Aave-style markets mint receipt tokens into the wallet: `aEthWETH` for
//! supplied WETH, `variableDebtEthUSDC` for borrowed USDC. The parser turns
//! a holdings snapshot into supplied/borrowed lists by recognizing those
//! symbol shapes. Borrowed amounts come only from debt-token balances; there
//! is no estimation involved.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::explorer::HoldingsSnapshot;

/// An amount of one token, used in supplied/borrowed lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetAmount {
    /// Base token symbol (e.g., "WETH")
    pub token: String,
    /// Token quantity (non-negative, decimal-scaled)
    pub amount: f64,
}

/// A lending position reconstructed from wallet receipt tokens, before any
/// health computation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPosition {
    /// Chain ID
    pub chain_id: u64,
    /// Human-readable chain name
    pub chain_name: String,
    /// Supplied collateral per base token
    pub supplied: Vec<AssetAmount>,
    /// Borrowed debt per base token
    pub borrowed: Vec<AssetAmount>,
}

/// Chain infixes the protocol embeds in receipt-token symbols.
const CHAIN_INFIX: &str = "BasSep|ArbSep|OptSep|Eth|Arb|Opt|Pol";

static ATOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^a(?:{CHAIN_INFIX})?([A-Z][A-Za-z0-9]*)$")).expect("valid aToken regex")
});

static DEBT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "^(?:variableDebt|stableDebt)(?:{CHAIN_INFIX})?([A-Z][A-Za-z0-9]*)$"
    ))
    .expect("valid debt-token regex")
});

/// Base token behind a supply receipt symbol, if it is one.
pub fn supplied_base(symbol: &str) -> Option<String> {
    ATOKEN_RE
        .captures(symbol)
        .map(|c| c[1].to_uppercase())
}

/// Base token behind a debt receipt symbol, if it is one.
pub fn borrowed_base(symbol: &str) -> Option<String> {
    DEBT_RE.captures(symbol).map(|c| c[1].to_uppercase())
}

/// Parses holdings snapshots into lending positions.
#[derive(Debug, Clone, Default)]
pub struct PositionParser;

impl PositionParser {
    pub fn new() -> Self {
        Self
    }

    /// Extract the lending position on one chain, or None when the wallet
    /// holds no receipt tokens there.
    pub fn parse(&self, holdings: &HoldingsSnapshot) -> Option<RawPosition> {
        let mut supplied: Vec<AssetAmount> = Vec::new();
        let mut borrowed: Vec<AssetAmount> = Vec::new();

        for token in &holdings.tokens {
            if token.balance <= 0.0 {
                continue;
            }
            if let Some(base) = borrowed_base(&token.symbol) {
                accumulate(&mut borrowed, base, token.balance);
            } else if let Some(base) = supplied_base(&token.symbol) {
                accumulate(&mut supplied, base, token.balance);
            }
        }

        if supplied.is_empty() && borrowed.is_empty() {
            return None;
        }

        Some(RawPosition {
            chain_id: holdings.chain_id,
            chain_name: holdings.chain_name.clone(),
            supplied,
            borrowed,
        })
    }
}

/// Add `amount` of `token` to the list, merging duplicates (e.g., variable
/// plus stable debt of the same token).
fn accumulate(assets: &mut Vec<AssetAmount>, token: String, amount: f64) {
    match assets.iter_mut().find(|a| a.token == token) {
        Some(existing) => existing.amount += amount,
        None => assets.push(AssetAmount { token, amount }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::TokenHolding;
    use alloy::primitives::Address;

    fn holding(symbol: &str, balance: f64) -> TokenHolding {
        TokenHolding {
            symbol: symbol.to_string(),
            address: Address::ZERO,
            balance,
            decimals: 18,
        }
    }

    fn snapshot(tokens: Vec<TokenHolding>) -> HoldingsSnapshot {
        HoldingsSnapshot {
            chain_id: 11155111,
            chain_name: "Sepolia".to_string(),
            tokens,
        }
    }

    #[test]
    fn test_symbol_recognition() {
        assert_eq!(supplied_base("aEthWETH").as_deref(), Some("WETH"));
        assert_eq!(supplied_base("aBasSepUSDC").as_deref(), Some("USDC"));
        assert_eq!(supplied_base("aWETH").as_deref(), Some("WETH"));
        assert_eq!(borrowed_base("variableDebtEthUSDC").as_deref(), Some("USDC"));
        assert_eq!(borrowed_base("stableDebtArbSepDAI").as_deref(), Some("DAI"));

        // Plain wallet tokens are neither
        assert_eq!(supplied_base("WETH"), None);
        assert_eq!(supplied_base("AAVE"), None);
        assert_eq!(borrowed_base("USDC"), None);
    }

    #[test]
    fn test_parse_builds_position() {
        let parser = PositionParser::new();
        let position = parser
            .parse(&snapshot(vec![
                holding("aEthWETH", 2.5),
                holding("variableDebtEthUSDC", 2000.0),
                holding("USDC", 50.0),
            ]))
            .unwrap();

        assert_eq!(position.supplied, vec![AssetAmount { token: "WETH".to_string(), amount: 2.5 }]);
        assert_eq!(
            position.borrowed,
            vec![AssetAmount { token: "USDC".to_string(), amount: 2000.0 }]
        );
    }

    #[test]
    fn test_parse_merges_debt_flavors_and_skips_zero() {
        let parser = PositionParser::new();
        let position = parser
            .parse(&snapshot(vec![
                holding("aEthWETH", 1.0),
                holding("variableDebtEthUSDC", 100.0),
                holding("stableDebtEthUSDC", 25.0),
                holding("aEthDAI", 0.0),
            ]))
            .unwrap();

        assert_eq!(position.supplied.len(), 1);
        assert_eq!(position.borrowed.len(), 1);
        assert!((position.borrowed[0].amount - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_none_without_receipt_tokens() {
        let parser = PositionParser::new();
        assert!(parser
            .parse(&snapshot(vec![holding("WETH", 5.0), holding("USDC", 10.0)]))
            .is_none());
    }
}

//! Asset risk parameter table.
//!
//! Per-asset collateral factors and liquidation thresholds for the assets
//! the protocol lists. The table is immutable, loaded once, and looked up
//! by exact (case-normalized) base symbol; unknown assets fall back to
//! documented defaults rather than failing evaluation.

use std::collections::HashMap;

/// Collateral factor applied to assets missing from the table.
pub const DEFAULT_COLLATERAL_FACTOR: f64 = 0.825;

/// Liquidation threshold applied to assets missing from the table.
pub const DEFAULT_LIQUIDATION_THRESHOLD: f64 = 0.80;

/// Risk parameters for one asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetRiskParams {
    /// Base token symbol (e.g., "WETH")
    pub symbol: &'static str,
    /// Borrowing-power fraction, in (0, 1]
    pub collateral_factor: f64,
    /// Fraction of supplied value counted as collateral in the health
    /// factor numerator, in (0, 1]
    pub liquidation_threshold: f64,
}

impl AssetRiskParams {
    const fn new(symbol: &'static str, collateral_factor: f64, liquidation_threshold: f64) -> Self {
        Self {
            symbol,
            collateral_factor,
            liquidation_threshold,
        }
    }
}

/// All listed assets.
pub static RISK_PARAMS: &[AssetRiskParams] = &[
    AssetRiskParams::new("ETH", 0.825, 0.80),
    AssetRiskParams::new("WETH", 0.825, 0.80),
    AssetRiskParams::new("USDC", 0.85, 0.82),
    AssetRiskParams::new("USDT", 0.85, 0.82),
    AssetRiskParams::new("DAI", 0.75, 0.72),
    AssetRiskParams::new("WBTC", 0.70, 0.65),
    AssetRiskParams::new("LINK", 0.65, 0.60),
    AssetRiskParams::new("UNI", 0.60, 0.55),
];

/// Immutable lookup table over [`RISK_PARAMS`].
///
/// Constructed once at startup and passed by reference; no global instance.
#[derive(Debug)]
pub struct AssetRiskTable {
    by_symbol: HashMap<&'static str, &'static AssetRiskParams>,
}

impl AssetRiskTable {
    /// Build the table from the static parameter list.
    pub fn new() -> Self {
        let mut by_symbol = HashMap::with_capacity(RISK_PARAMS.len());
        for params in RISK_PARAMS {
            by_symbol.insert(params.symbol, params);
        }
        Self { by_symbol }
    }

    /// Risk parameters for `symbol`, if listed.
    pub fn get(&self, symbol: &str) -> Option<&'static AssetRiskParams> {
        self.by_symbol.get(symbol.to_uppercase().as_str()).copied()
    }

    /// Collateral factor for `symbol`, with the documented fallback.
    pub fn collateral_factor(&self, symbol: &str) -> f64 {
        self.get(symbol)
            .map(|p| p.collateral_factor)
            .unwrap_or(DEFAULT_COLLATERAL_FACTOR)
    }

    /// Liquidation threshold for `symbol`, with the documented fallback.
    pub fn liquidation_threshold(&self, symbol: &str) -> f64 {
        self.get(symbol)
            .map(|p| p.liquidation_threshold)
            .unwrap_or(DEFAULT_LIQUIDATION_THRESHOLD)
    }
}

impl Default for AssetRiskTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_normalized() {
        let table = AssetRiskTable::new();
        assert_eq!(table.liquidation_threshold("weth"), 0.80);
        assert_eq!(table.collateral_factor("usdc"), 0.85);
    }

    #[test]
    fn test_unknown_asset_falls_back() {
        let table = AssetRiskTable::new();
        assert!(table.get("XYZ").is_none());
        assert_eq!(table.collateral_factor("XYZ"), DEFAULT_COLLATERAL_FACTOR);
        assert_eq!(table.liquidation_threshold("XYZ"), DEFAULT_LIQUIDATION_THRESHOLD);
    }

    #[test]
    fn test_params_are_in_unit_interval() {
        for params in RISK_PARAMS {
            assert!(params.collateral_factor > 0.0 && params.collateral_factor <= 1.0);
            assert!(params.liquidation_threshold > 0.0 && params.liquidation_threshold <= 1.0);
        }
    }
}

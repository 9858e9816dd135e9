//! Health factor computation.
//!
//! Implements the Aave solvency formula:
//!
//! `HF = Σ(supplied_i × price_i × liquidation_threshold_i) / Σ(borrowed_j × price_j)`
//!
//! The computation is pure and total: missing prices contribute zero to
//! either side, missing risk parameters take the table fallbacks, and a
//! position with no debt (or a zero-valued denominator) is +infinity,
//! never NaN or an error.

use std::sync::Arc;

use guardian_api::{AssetAmount, PriceSnapshot};

use crate::risk_table::AssetRiskTable;

/// Health factor plus the USD totals the aggregator needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthBreakdown {
    /// Risk-weighted collateral over debt; +infinity when debt-free
    pub health_factor: f64,
    /// Unweighted supplied value in USD
    pub total_collateral_usd: f64,
    /// Supplied value weighted by liquidation thresholds
    pub risk_adjusted_collateral_usd: f64,
    /// Borrowed value in USD
    pub total_borrowed_usd: f64,
}

/// Pure health factor engine over an immutable risk table.
#[derive(Debug, Clone)]
pub struct HealthFactorEngine {
    table: Arc<AssetRiskTable>,
}

impl HealthFactorEngine {
    /// Create an engine over the given risk table.
    pub fn new(table: Arc<AssetRiskTable>) -> Self {
        Self { table }
    }

    /// Compute the health factor and USD totals for one position.
    ///
    /// `prices` is valid only for this call; nothing is cached here.
    pub fn evaluate(
        &self,
        supplied: &[AssetAmount],
        borrowed: &[AssetAmount],
        prices: &PriceSnapshot,
    ) -> HealthBreakdown {
        let mut total_collateral_usd = 0.0;
        let mut risk_adjusted_collateral_usd = 0.0;
        for asset in supplied {
            let price = prices.usd(&asset.token).unwrap_or(0.0);
            let value = asset.amount * price;
            total_collateral_usd += value;
            risk_adjusted_collateral_usd += value * self.table.liquidation_threshold(&asset.token);
        }

        let mut total_borrowed_usd = 0.0;
        for asset in borrowed {
            let price = prices.usd(&asset.token).unwrap_or(0.0);
            total_borrowed_usd += asset.amount * price;
        }

        // No debt means unconditionally solvent, regardless of collateral.
        let debt_free = borrowed.iter().all(|a| a.amount == 0.0);
        let health_factor = if debt_free || total_borrowed_usd == 0.0 {
            f64::INFINITY
        } else {
            risk_adjusted_collateral_usd / total_borrowed_usd
        };

        HealthBreakdown {
            health_factor,
            total_collateral_usd,
            risk_adjusted_collateral_usd,
            total_borrowed_usd,
        }
    }
}

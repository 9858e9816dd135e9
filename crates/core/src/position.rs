//! Position data structures.

use alloy::primitives::Address;
use guardian_api::{AssetAmount, RawPosition};
use smallvec::SmallVec;

use crate::health::HealthBreakdown;
use crate::risk::RiskLevel;

/// A collateralized lending position on one chain, with derived health
/// metrics.
///
/// Health factor and risk level are recomputed whole on every evaluation
/// cycle, never patched incrementally.
#[derive(Debug, Clone)]
pub struct Position {
    /// Owning wallet
    pub owner: Address,
    /// Chain ID
    pub chain_id: u64,
    /// Human-readable chain name
    pub chain_name: String,
    /// Supplied collateral
    pub supplied: SmallVec<[AssetAmount; 4]>,
    /// Borrowed debt
    pub borrowed: SmallVec<[AssetAmount; 4]>,
    /// Derived health factor (+infinity when debt-free)
    pub health_factor: f64,
    /// Derived risk level
    pub risk_level: RiskLevel,
    /// Unweighted supplied value in USD
    pub total_collateral_usd: f64,
    /// Borrowed value in USD
    pub total_borrowed_usd: f64,
}

impl Position {
    /// Combine a parsed position with its computed health breakdown.
    pub fn from_raw(
        owner: Address,
        raw: RawPosition,
        breakdown: HealthBreakdown,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            owner,
            chain_id: raw.chain_id,
            chain_name: raw.chain_name,
            supplied: SmallVec::from_vec(raw.supplied),
            borrowed: SmallVec::from_vec(raw.borrowed),
            health_factor: breakdown.health_factor,
            risk_level,
            total_collateral_usd: breakdown.total_collateral_usd,
            total_borrowed_usd: breakdown.total_borrowed_usd,
        }
    }

    /// Whether the position carries any debt.
    pub fn has_debt(&self) -> bool {
        self.borrowed.iter().any(|a| a.amount > 0.0)
    }

    /// The largest borrowed asset by declared amount, if any.
    pub fn largest_debt(&self) -> Option<&AssetAmount> {
        self.borrowed
            .iter()
            .filter(|a| a.amount > 0.0)
            .max_by(|a, b| a.amount.total_cmp(&b.amount))
    }

    /// The largest supplied asset by declared amount, if any.
    pub fn largest_collateral(&self) -> Option<&AssetAmount> {
        self.supplied
            .iter()
            .filter(|a| a.amount > 0.0)
            .max_by(|a, b| a.amount.total_cmp(&b.amount))
    }
}

//! Cross-chain portfolio aggregation.

use serde::Serialize;

use crate::position::Position;
use crate::risk::{RiskClassifier, RiskLevel};

/// Wallet-wide totals across all chains.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSummary {
    /// Sum of unweighted collateral value in USD
    pub total_collateral_usd: f64,
    /// Sum of borrowed value in USD
    pub total_borrowed_usd: f64,
    /// Collateral minus debt
    pub net_value_usd: f64,
    /// Collateral-weighted average health factor over debt-bearing
    /// positions
    pub weighted_health_factor: f64,
    /// Risk level of the weighted health factor
    pub overall_risk: RiskLevel,
    /// Number of positions aggregated
    pub position_count: usize,
}

/// Rolls per-chain positions up into one portfolio summary.
#[derive(Debug, Clone, Copy)]
pub struct PositionAggregator {
    classifier: RiskClassifier,
}

impl PositionAggregator {
    pub fn new(classifier: RiskClassifier) -> Self {
        Self { classifier }
    }

    /// Aggregate positions into wallet-wide totals.
    ///
    /// The weighted health factor averages over debt-bearing positions
    /// only, so one infinite debt-free position cannot mask a critical one
    /// elsewhere. With no debt anywhere the portfolio is +infinity (Safe);
    /// with no priced collateral at all it is 0 (Critical).
    pub fn aggregate(&self, positions: &[Position]) -> PortfolioSummary {
        let total_collateral_usd: f64 = positions.iter().map(|p| p.total_collateral_usd).sum();
        let total_borrowed_usd: f64 = positions.iter().map(|p| p.total_borrowed_usd).sum();

        let weighted_health_factor = if total_collateral_usd == 0.0 {
            0.0
        } else {
            let mut weighted_sum = 0.0;
            let mut weight = 0.0;
            for position in positions.iter().filter(|p| p.has_debt()) {
                weighted_sum += position.health_factor * position.total_collateral_usd;
                weight += position.total_collateral_usd;
            }
            if weight == 0.0 {
                // Collateral exists but nothing is borrowed against it
                f64::INFINITY
            } else {
                weighted_sum / weight
            }
        };

        PortfolioSummary {
            total_collateral_usd,
            total_borrowed_usd,
            net_value_usd: total_collateral_usd - total_borrowed_usd,
            weighted_health_factor,
            overall_risk: self.classifier.classify(weighted_health_factor),
            position_count: positions.len(),
        }
    }
}

impl Default for PositionAggregator {
    fn default() -> Self {
        Self::new(RiskClassifier::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use smallvec::smallvec;

    use guardian_api::AssetAmount;

    fn position(
        chain_id: u64,
        health_factor: f64,
        collateral_usd: f64,
        borrowed_usd: f64,
    ) -> Position {
        let borrowed = if borrowed_usd > 0.0 {
            smallvec![AssetAmount {
                token: "USDC".to_string(),
                amount: borrowed_usd,
            }]
        } else {
            smallvec![]
        };
        Position {
            owner: Address::ZERO,
            chain_id,
            chain_name: "test".to_string(),
            supplied: smallvec![],
            borrowed,
            health_factor,
            risk_level: RiskClassifier::default().classify(health_factor),
            total_collateral_usd: collateral_usd,
            total_borrowed_usd: borrowed_usd,
        }
    }

    #[test]
    fn test_weighted_average_over_debt_bearing_positions() {
        let aggregator = PositionAggregator::default();
        let positions = vec![
            position(1, 2.0, 6000.0, 2400.0),
            position(2, 1.2, 2000.0, 1500.0),
            // Debt-free, excluded from the weighting despite infinite HF
            position(3, f64::INFINITY, 2000.0, 0.0),
        ];

        let summary = aggregator.aggregate(&positions);
        // (2.0*6000 + 1.2*2000) / 8000 = 1.8
        assert!((summary.weighted_health_factor - 1.8).abs() < 1e-9);
        assert_eq!(summary.overall_risk, RiskLevel::Warning);
        assert_eq!(summary.position_count, 3);
        assert!((summary.total_collateral_usd - 10000.0).abs() < 1e-9);
        assert!((summary.net_value_usd - 6100.0).abs() < 1e-9);
    }

    #[test]
    fn test_debt_free_portfolio_is_safe() {
        let summary = PositionAggregator::default()
            .aggregate(&[position(1, f64::INFINITY, 5000.0, 0.0)]);
        assert_eq!(summary.weighted_health_factor, f64::INFINITY);
        assert_eq!(summary.overall_risk, RiskLevel::Safe);
    }

    #[test]
    fn test_zero_collateral_portfolio_is_critical() {
        let summary = PositionAggregator::default().aggregate(&[position(1, 0.0, 0.0, 100.0)]);
        assert_eq!(summary.weighted_health_factor, 0.0);
        assert_eq!(summary.overall_risk, RiskLevel::Critical);

        let empty = PositionAggregator::default().aggregate(&[]);
        assert_eq!(empty.weighted_health_factor, 0.0);
        assert_eq!(empty.position_count, 0);
    }

    #[test]
    fn test_critical_position_dominates_by_weight() {
        // A heavily collateralized critical position drags the average
        // below the healthy one
        let positions = vec![
            position(1, 1.05, 9000.0, 8000.0),
            position(2, 2.5, 1000.0, 300.0),
        ];
        let summary = PositionAggregator::default().aggregate(&positions);
        // (1.05*9000 + 2.5*1000) / 10000 = 1.195
        assert!((summary.weighted_health_factor - 1.195).abs() < 1e-9);
        assert_eq!(summary.overall_risk, RiskLevel::Critical);
    }
}

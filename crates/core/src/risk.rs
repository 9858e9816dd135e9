//! Risk classification over health factors.

use serde::{Deserialize, Serialize};

/// Discrete risk level for a position or portfolio.
///
/// Ordered from safest to most at risk, so `Danger < Critical` holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// HF at or above the safe bound
    Safe,
    /// HF in [warning, safe)
    Warning,
    /// HF in [danger, warning)
    Danger,
    /// HF below the danger bound
    Critical,
}

impl RiskLevel {
    /// Lowercase name for logs and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Critical => "critical",
        }
    }

    /// Whether this level warrants remediation proposals.
    pub fn needs_action(&self) -> bool {
        matches!(self, Self::Danger | Self::Critical)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health factor band boundaries.
///
/// Bands are half-open on the lower side: a health factor exactly at a
/// boundary belongs to the safer band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskBands {
    /// HF at or above this is Safe
    #[serde(default = "default_safe")]
    pub safe: f64,

    /// HF at or above this (and below safe) is Warning
    #[serde(default = "default_warning")]
    pub warning: f64,

    /// HF at or above this (and below warning) is Danger; below is Critical
    #[serde(default = "default_danger")]
    pub danger: f64,

    /// HF below this is liquidatable (a subset of Critical)
    #[serde(default = "default_liquidation")]
    pub liquidation: f64,
}

fn default_safe() -> f64 {
    2.0
}
fn default_warning() -> f64 {
    1.5
}
fn default_danger() -> f64 {
    1.25
}
fn default_liquidation() -> f64 {
    1.0
}

impl Default for RiskBands {
    fn default() -> Self {
        Self {
            safe: default_safe(),
            warning: default_warning(),
            danger: default_danger(),
            liquidation: default_liquidation(),
        }
    }
}

/// Maps health factors to risk levels.
#[derive(Debug, Clone, Copy)]
pub struct RiskClassifier {
    bands: RiskBands,
}

impl RiskClassifier {
    /// Create a classifier over the given bands.
    pub fn new(bands: RiskBands) -> Self {
        Self { bands }
    }

    /// Classify a health factor. Total over all reals and +infinity.
    pub fn classify(&self, health_factor: f64) -> RiskLevel {
        if health_factor >= self.bands.safe {
            RiskLevel::Safe
        } else if health_factor >= self.bands.warning {
            RiskLevel::Warning
        } else if health_factor >= self.bands.danger {
            RiskLevel::Danger
        } else {
            RiskLevel::Critical
        }
    }

    /// Whether the position is below the liquidation bound (HF < 1.0 by
    /// default). Liquidatable positions are always Critical.
    pub fn is_liquidatable(&self, health_factor: f64) -> bool {
        health_factor < self.bands.liquidation
    }

    /// The configured bands.
    pub fn bands(&self) -> &RiskBands {
        &self.bands
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new(RiskBands::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_are_half_open() {
        let classifier = RiskClassifier::default();

        assert_eq!(classifier.classify(2.0), RiskLevel::Safe);
        assert_eq!(classifier.classify(1.999), RiskLevel::Warning);
        assert_eq!(classifier.classify(1.5), RiskLevel::Warning);
        assert_eq!(classifier.classify(1.499), RiskLevel::Danger);
        assert_eq!(classifier.classify(1.25), RiskLevel::Danger);
        assert_eq!(classifier.classify(1.249), RiskLevel::Critical);
    }

    #[test]
    fn test_classify_is_total() {
        let classifier = RiskClassifier::default();

        assert_eq!(classifier.classify(f64::INFINITY), RiskLevel::Safe);
        assert_eq!(classifier.classify(0.0), RiskLevel::Critical);
        assert_eq!(classifier.classify(-1.0), RiskLevel::Critical);
        assert_eq!(classifier.classify(1e9), RiskLevel::Safe);
    }

    #[test]
    fn test_liquidatable_is_subset_of_critical() {
        let classifier = RiskClassifier::default();

        assert!(classifier.is_liquidatable(0.99));
        assert_eq!(classifier.classify(0.99), RiskLevel::Critical);

        // Critical but not yet liquidatable
        assert!(!classifier.is_liquidatable(1.1));
        assert_eq!(classifier.classify(1.1), RiskLevel::Critical);
    }

    #[test]
    fn test_levels_order_by_risk() {
        assert!(RiskLevel::Safe < RiskLevel::Warning);
        assert!(RiskLevel::Danger < RiskLevel::Critical);
        assert!(RiskLevel::Critical.needs_action());
        assert!(!RiskLevel::Warning.needs_action());
    }
}

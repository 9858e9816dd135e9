//! Core risk engine for multi-chain lending positions.
//!
//! The pipeline runs from raw wallet holdings to actionable output:
//! positions are parsed from receipt tokens, priced, scored with the
//! Aave health factor formula, classified into risk bands, fed through
//! the alert lifecycle, and, when at risk, given a validated remediation
//! plan. [`monitor::PositionMonitor`] ties the stages together.

pub mod alerts;
pub mod config;
pub mod health;
pub mod monitor;
pub mod plan;
pub mod portfolio;
pub mod position;
pub mod proposer;
pub mod risk;
pub mod risk_table;

pub use alerts::{
    Alert, AlertDecision, AlertLifecycleManager, AlertStore, AlertType, InMemoryAlertStore,
    ResolveThresholds, Severity,
};
pub use config::{ChainConfig, GuardianConfig, MonitorTimingConfig};
pub use health::{HealthBreakdown, HealthFactorEngine};
pub use monitor::{PositionMonitor, WalletReport};
pub use plan::{ActionValidator, ValidatedActionPlan};
pub use portfolio::{PortfolioSummary, PositionAggregator};
pub use position::Position;
pub use proposer::{
    ActionProposer, GeneratorBackedProposer, ProposalGenerator, RuleBasedProposer,
};
pub use risk::{RiskBands, RiskClassifier, RiskLevel};
pub use risk_table::{AssetRiskParams, AssetRiskTable};

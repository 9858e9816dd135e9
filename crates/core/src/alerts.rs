//! Alert lifecycle management.
//!
//! Per (owner, chain, alert type) an alert moves absent -> unresolved ->
//! resolved. Creation happens when the health factor enters an alerting
//! band; resolution requires recovery past a separate, higher threshold so
//! small fluctuations around a single boundary cannot flap an alert open
//! and closed. Resolved is terminal for an alert instance; a new one may be
//! created later under the same idempotency rule.
//!
//! This module only decides create/resolve actions. Persistence is the
//! caller's concern; see [`AlertStore`] for the uniqueness invariant the
//! storage layer must enforce.

use std::collections::VecDeque;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::risk::RiskBands;

/// Category of alert. At most one unresolved alert per (owner, chain, type)
/// exists at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Health factor entered the danger band
    HealthFactor,
    /// Health factor entered the critical band
    LiquidationRisk,
    /// Sharp price move on a held asset
    PriceVolatility,
    /// Operational notice
    System,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HealthFactor => "health_factor",
            Self::LiquidationRisk => "liquidation_risk",
            Self::PriceVolatility => "price_volatility",
            Self::System => "system",
        }
    }
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A risk alert for one position.
#[derive(Debug, Clone)]
pub struct Alert {
    /// Owning wallet
    pub owner: Address,
    /// Chain the position lives on
    pub chain_id: u64,
    /// Human-readable chain name
    pub chain_name: String,
    /// Alert category
    pub alert_type: AlertType,
    /// Severity at creation
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Health factor observed when the alert was created
    pub health_factor_at_creation: f64,
    /// Whether the alert has been resolved
    pub is_resolved: bool,
    /// When the alert was resolved
    pub resolved_at: Option<DateTime<Utc>>,
    /// When the alert was created
    pub created_at: DateTime<Utc>,
}

/// A create or resolve decision returned to the caller for persistence.
#[derive(Debug, Clone)]
pub enum AlertDecision {
    /// Persist a new unresolved alert
    Create(Alert),
    /// Mark the unresolved alert of this type as resolved
    Resolve {
        owner: Address,
        chain_id: u64,
        alert_type: AlertType,
    },
}

/// Recovery thresholds closing alerts, strictly above the bands that create
/// them (hysteresis).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResolveThresholds {
    /// HF at or above this resolves a health_factor alert
    #[serde(default = "default_health_factor_resolve")]
    pub health_factor: f64,

    /// HF at or above this resolves a liquidation_risk alert
    #[serde(default = "default_liquidation_risk_resolve")]
    pub liquidation_risk: f64,
}

fn default_health_factor_resolve() -> f64 {
    2.0
}
fn default_liquidation_risk_resolve() -> f64 {
    1.5
}

impl Default for ResolveThresholds {
    fn default() -> Self {
        Self {
            health_factor: default_health_factor_resolve(),
            liquidation_risk: default_liquidation_risk_resolve(),
        }
    }
}

/// Decides alert creation and resolution from health factor transitions.
#[derive(Debug, Clone)]
pub struct AlertLifecycleManager {
    bands: RiskBands,
    resolve: ResolveThresholds,
}

impl AlertLifecycleManager {
    /// Create a manager over the given bands and recovery thresholds.
    pub fn new(bands: RiskBands, resolve: ResolveThresholds) -> Self {
        Self { bands, resolve }
    }

    /// Evaluate one position against its currently unresolved alerts.
    ///
    /// Idempotent: with an unchanged health factor and an unresolved set
    /// reflecting prior decisions, a second call returns no new creates.
    pub fn evaluate(
        &self,
        owner: Address,
        chain_id: u64,
        chain_name: &str,
        health_factor: f64,
        unresolved: &[Alert],
    ) -> Vec<AlertDecision> {
        let mut decisions = Vec::new();

        let has = |alert_type: AlertType| {
            unresolved
                .iter()
                .any(|a| a.alert_type == alert_type && !a.is_resolved)
        };

        if health_factor < self.bands.danger {
            // Critical band
            if !has(AlertType::LiquidationRisk) {
                let (severity, message) = if health_factor < self.bands.liquidation {
                    (
                        Severity::Critical,
                        format!(
                            "CRITICAL: position on {chain_name} is at immediate risk of \
                             liquidation (HF {health_factor:.2}). Take action immediately."
                        ),
                    )
                } else {
                    (
                        Severity::High,
                        format!(
                            "DANGER: position on {chain_name} is close to liquidation \
                             (HF {health_factor:.2}). Repay debt or add collateral."
                        ),
                    )
                };
                decisions.push(AlertDecision::Create(Alert {
                    owner,
                    chain_id,
                    chain_name: chain_name.to_string(),
                    alert_type: AlertType::LiquidationRisk,
                    severity,
                    message,
                    health_factor_at_creation: health_factor,
                    is_resolved: false,
                    resolved_at: None,
                    created_at: Utc::now(),
                }));
            }
        } else if health_factor < self.bands.warning {
            // Danger band
            if !has(AlertType::HealthFactor) {
                decisions.push(AlertDecision::Create(Alert {
                    owner,
                    chain_id,
                    chain_name: chain_name.to_string(),
                    alert_type: AlertType::HealthFactor,
                    severity: Severity::Medium,
                    message: format!(
                        "WARNING: health factor on {chain_name} is low \
                         (HF {health_factor:.2}). Monitor closely."
                    ),
                    health_factor_at_creation: health_factor,
                    is_resolved: false,
                    resolved_at: None,
                    created_at: Utc::now(),
                }));
            }
        }

        for alert in unresolved.iter().filter(|a| !a.is_resolved) {
            let recovered = match alert.alert_type {
                AlertType::LiquidationRisk => health_factor >= self.resolve.liquidation_risk,
                AlertType::HealthFactor => health_factor >= self.resolve.health_factor,
                // No HF-based recovery rule for other types
                AlertType::PriceVolatility | AlertType::System => false,
            };
            if recovered {
                decisions.push(AlertDecision::Resolve {
                    owner,
                    chain_id,
                    alert_type: alert.alert_type,
                });
            }
        }

        decisions
    }
}

/// Persistence seam for alerts.
///
/// Implementations must enforce uniqueness of (owner, chain, type,
/// unresolved): the manager's existence check is race-prone on its own, so
/// a duplicate unresolved insert has to be rejected at the storage layer
/// and treated as a no-op.
pub trait AlertStore: Send + Sync {
    /// Currently unresolved alerts for one position.
    fn unresolved(&self, owner: Address, chain_id: u64) -> Vec<Alert>;

    /// Insert an unresolved alert. Returns false (no-op) when an unresolved
    /// alert of the same (owner, chain, type) already exists.
    fn insert_unresolved(&self, alert: Alert) -> bool;

    /// Resolve the unresolved alert of this type, if present.
    fn resolve(&self, owner: Address, chain_id: u64, alert_type: AlertType, at: DateTime<Utc>);
}

/// Oldest resolved alerts are evicted past this bound; durable history is
/// an external store's concern.
const MAX_RESOLVED_HISTORY: usize = 1024;

/// In-memory alert store keyed by (owner, chain, type).
///
/// The `DashMap` entry lock makes insert-if-absent atomic, which is the
/// uniqueness constraint the trait requires. Resolved history keeps only
/// the most recent [`MAX_RESOLVED_HISTORY`] alerts.
#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
    unresolved: DashMap<(Address, u64, AlertType), Alert>,
    resolved: RwLock<VecDeque<Alert>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retained resolved alerts, oldest first.
    pub fn resolved_history(&self) -> Vec<Alert> {
        self.resolved.read().iter().cloned().collect()
    }

    /// Total number of unresolved alerts across all positions.
    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }
}

impl AlertStore for InMemoryAlertStore {
    fn unresolved(&self, owner: Address, chain_id: u64) -> Vec<Alert> {
        self.unresolved
            .iter()
            .filter(|entry| {
                let (o, c, _) = entry.key();
                *o == owner && *c == chain_id
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn insert_unresolved(&self, alert: Alert) -> bool {
        match self
            .unresolved
            .entry((alert.owner, alert.chain_id, alert.alert_type))
        {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(alert);
                true
            }
        }
    }

    fn resolve(&self, owner: Address, chain_id: u64, alert_type: AlertType, at: DateTime<Utc>) {
        if let Some((_, mut alert)) = self.unresolved.remove(&(owner, chain_id, alert_type)) {
            alert.is_resolved = true;
            alert.resolved_at = Some(at);
            let mut resolved = self.resolved.write();
            if resolved.len() == MAX_RESOLVED_HISTORY {
                resolved.pop_front();
            }
            resolved.push_back(alert);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> AlertLifecycleManager {
        AlertLifecycleManager::new(RiskBands::default(), ResolveThresholds::default())
    }

    fn creates(decisions: &[AlertDecision]) -> Vec<AlertType> {
        decisions
            .iter()
            .filter_map(|d| match d {
                AlertDecision::Create(a) => Some(a.alert_type),
                _ => None,
            })
            .collect()
    }

    fn resolves(decisions: &[AlertDecision]) -> Vec<AlertType> {
        decisions
            .iter()
            .filter_map(|d| match d {
                AlertDecision::Resolve { alert_type, .. } => Some(*alert_type),
                _ => None,
            })
            .collect()
    }

    /// Apply decisions to a store the way the monitor does.
    fn apply(store: &InMemoryAlertStore, decisions: &[AlertDecision]) {
        for decision in decisions {
            match decision {
                AlertDecision::Create(alert) => {
                    store.insert_unresolved(alert.clone());
                }
                AlertDecision::Resolve {
                    owner,
                    chain_id,
                    alert_type,
                } => store.resolve(*owner, *chain_id, *alert_type, Utc::now()),
            }
        }
    }

    #[test]
    fn test_liquidatable_position_creates_critical_alert() {
        let decisions = manager().evaluate(Address::ZERO, 1, "Sepolia", 0.95, &[]);
        assert_eq!(creates(&decisions), vec![AlertType::LiquidationRisk]);
        match &decisions[0] {
            AlertDecision::Create(alert) => {
                assert_eq!(alert.severity, Severity::Critical);
                assert!((alert.health_factor_at_creation - 0.95).abs() < 1e-9);
            }
            other => panic!("expected create, got {other:?}"),
        }
    }

    #[test]
    fn test_critical_band_above_liquidation_is_high_severity() {
        let decisions = manager().evaluate(Address::ZERO, 1, "Sepolia", 1.1, &[]);
        match &decisions[0] {
            AlertDecision::Create(alert) => {
                assert_eq!(alert.alert_type, AlertType::LiquidationRisk);
                assert_eq!(alert.severity, Severity::High);
            }
            other => panic!("expected create, got {other:?}"),
        }
    }

    #[test]
    fn test_danger_band_creates_health_factor_alert() {
        let decisions = manager().evaluate(Address::ZERO, 1, "Sepolia", 1.3, &[]);
        assert_eq!(creates(&decisions), vec![AlertType::HealthFactor]);
    }

    #[test]
    fn test_creation_is_idempotent() {
        let mgr = manager();
        let store = InMemoryAlertStore::new();

        let first = mgr.evaluate(Address::ZERO, 1, "Sepolia", 1.0, &[]);
        assert_eq!(first.len(), 1);
        apply(&store, &first);

        // Same health factor, same unresolved set: no new decisions
        let second = mgr.evaluate(Address::ZERO, 1, "Sepolia", 1.0, &store.unresolved(Address::ZERO, 1));
        assert!(second.is_empty());
    }

    #[test]
    fn test_hysteresis_prevents_flapping() {
        let mgr = manager();
        let store = InMemoryAlertStore::new();
        let owner = Address::ZERO;

        // Drop below danger: one liquidation_risk create
        apply(&store, &mgr.evaluate(owner, 1, "Sepolia", 1.20, &[]));
        assert_eq!(store.unresolved_count(), 1);

        // Oscillate 1.20 <-> 1.30 repeatedly: the 1.30 passes create a
        // single health_factor alert, but the liquidation_risk alert never
        // resolves below 1.5 and nothing flaps
        for _ in 0..5 {
            let up = mgr.evaluate(owner, 1, "Sepolia", 1.30, &store.unresolved(owner, 1));
            assert!(resolves(&up).is_empty());
            apply(&store, &up);

            let down = mgr.evaluate(owner, 1, "Sepolia", 1.20, &store.unresolved(owner, 1));
            assert!(resolves(&down).is_empty());
            assert!(creates(&down).is_empty());
            apply(&store, &down);
        }
        assert_eq!(store.unresolved_count(), 2);
        assert!(store.resolved_history().is_empty());

        // Recovery past the resolve threshold closes liquidation_risk
        let recovered = mgr.evaluate(owner, 1, "Sepolia", 1.6, &store.unresolved(owner, 1));
        assert_eq!(resolves(&recovered), vec![AlertType::LiquidationRisk]);
    }

    #[test]
    fn test_health_factor_alert_resolves_at_safe_bound() {
        let mgr = manager();
        let store = InMemoryAlertStore::new();
        let owner = Address::ZERO;

        apply(&store, &mgr.evaluate(owner, 1, "Sepolia", 1.4, &[]));

        // 1.9 is Warning but below the resolve bound: still open
        let partial = mgr.evaluate(owner, 1, "Sepolia", 1.9, &store.unresolved(owner, 1));
        assert!(partial.is_empty());

        let full = mgr.evaluate(owner, 1, "Sepolia", 2.1, &store.unresolved(owner, 1));
        assert_eq!(resolves(&full), vec![AlertType::HealthFactor]);
        apply(&store, &full);

        assert_eq!(store.unresolved_count(), 0);
        assert_eq!(store.resolved_history().len(), 1);
        assert!(store.resolved_history()[0].resolved_at.is_some());
    }

    #[test]
    fn test_fresh_alert_after_resolution() {
        let mgr = manager();
        let store = InMemoryAlertStore::new();
        let owner = Address::ZERO;

        apply(&store, &mgr.evaluate(owner, 1, "Sepolia", 1.0, &[]));
        apply(&store, &mgr.evaluate(owner, 1, "Sepolia", 2.5, &store.unresolved(owner, 1)));
        assert_eq!(store.unresolved_count(), 0);

        // A later drop creates a brand-new alert instance
        let again = mgr.evaluate(owner, 1, "Sepolia", 1.0, &store.unresolved(owner, 1));
        assert_eq!(creates(&again), vec![AlertType::LiquidationRisk]);
    }

    #[test]
    fn test_store_rejects_duplicate_unresolved() {
        let store = InMemoryAlertStore::new();
        let alert = match manager()
            .evaluate(Address::ZERO, 1, "Sepolia", 1.0, &[])
            .remove(0)
        {
            AlertDecision::Create(alert) => alert,
            other => panic!("expected create, got {other:?}"),
        };

        assert!(store.insert_unresolved(alert.clone()));
        // Racing duplicate is a no-op, not an error
        assert!(!store.insert_unresolved(alert));
        assert_eq!(store.unresolved_count(), 1);
    }

    #[test]
    fn test_resolved_history_is_bounded() {
        let mgr = manager();
        let store = InMemoryAlertStore::new();
        let owner = Address::ZERO;

        // One create/resolve pair per chain, a few past the retention cap
        let total = MAX_RESOLVED_HISTORY as u64 + 8;
        for chain_id in 0..total {
            apply(&store, &mgr.evaluate(owner, chain_id, "Sepolia", 1.0, &[]));
            apply(
                &store,
                &mgr.evaluate(owner, chain_id, "Sepolia", 2.5, &store.unresolved(owner, chain_id)),
            );
        }

        let history = store.resolved_history();
        assert_eq!(history.len(), MAX_RESOLVED_HISTORY);
        // Oldest entries were evicted
        assert_eq!(history[0].chain_id, 8);
        assert_eq!(history.last().map(|a| a.chain_id), Some(total - 1));
    }

    #[test]
    fn test_alerts_scoped_per_chain() {
        let mgr = manager();
        let store = InMemoryAlertStore::new();
        let owner = Address::ZERO;

        apply(&store, &mgr.evaluate(owner, 1, "Sepolia", 1.0, &[]));
        // Different chain: independent state machine
        let other_chain = mgr.evaluate(owner, 2, "Base Sepolia", 1.0, &store.unresolved(owner, 2));
        assert_eq!(creates(&other_chain), vec![AlertType::LiquidationRisk]);
    }
}

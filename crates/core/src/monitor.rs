//! Position monitoring loop.
//!
//! One [`PositionMonitor`] owns the whole evaluation pipeline: fetch
//! holdings per chain, parse positions, price the assets, compute health
//! factors, drive the alert lifecycle, and for positions that need action,
//! propose and validate a remediation plan. Wallets are isolated: a
//! failure evaluating one never aborts the cycle for the rest.

use std::collections::BTreeSet;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::Result;
use futures::future::join_all;
use tracing::{debug, error, info, instrument, warn};

use guardian_api::{
    ChainEndpoint, HoldingsSnapshot, HoldingsSource, PositionParser, PriceSnapshot, PriceSource,
};

use crate::alerts::{AlertDecision, AlertLifecycleManager, AlertStore};
use crate::config::MonitorTimingConfig;
use crate::health::HealthFactorEngine;
use crate::plan::{ActionValidator, ValidatedActionPlan};
use crate::portfolio::{PortfolioSummary, PositionAggregator};
use crate::position::Position;
use crate::proposer::ActionProposer;
use crate::risk::RiskClassifier;

/// Everything one evaluation cycle produced for a single wallet.
#[derive(Debug)]
pub struct WalletReport {
    /// Evaluated wallet
    pub owner: Address,
    /// Per-chain positions with derived health metrics
    pub positions: Vec<Position>,
    /// Wallet-wide totals
    pub summary: PortfolioSummary,
    /// Alert decisions made this cycle
    pub decisions: Vec<AlertDecision>,
    /// Validated remediation plans for at-risk positions
    pub plans: Vec<ValidatedActionPlan>,
}

/// The monitoring orchestrator.
pub struct PositionMonitor {
    explorer: Arc<dyn HoldingsSource>,
    prices: Arc<dyn PriceSource>,
    parser: PositionParser,
    engine: HealthFactorEngine,
    classifier: RiskClassifier,
    aggregator: PositionAggregator,
    alerts: AlertLifecycleManager,
    store: Arc<dyn AlertStore>,
    proposer: Arc<dyn ActionProposer>,
    validator: ActionValidator,
    endpoints: Vec<ChainEndpoint>,
    timing: MonitorTimingConfig,
}

impl PositionMonitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        explorer: Arc<dyn HoldingsSource>,
        prices: Arc<dyn PriceSource>,
        engine: HealthFactorEngine,
        classifier: RiskClassifier,
        alerts: AlertLifecycleManager,
        store: Arc<dyn AlertStore>,
        proposer: Arc<dyn ActionProposer>,
        endpoints: Vec<ChainEndpoint>,
        timing: MonitorTimingConfig,
    ) -> Self {
        Self {
            explorer,
            prices,
            parser: PositionParser::new(),
            engine,
            aggregator: PositionAggregator::new(classifier),
            classifier,
            alerts,
            store,
            proposer,
            validator: ActionValidator::new(),
            endpoints,
            timing,
        }
    }

    /// Run evaluation cycles forever.
    ///
    /// Each wallet is evaluated independently; a wallet that errors is
    /// logged and skipped until the next cycle.
    pub async fn run(&self, wallets: &[Address]) -> Result<()> {
        info!(
            wallets = wallets.len(),
            chains = self.endpoints.len(),
            interval_secs = self.timing.cycle_interval_secs,
            "Starting position monitor"
        );

        let mut interval = tokio::time::interval(self.timing.cycle_interval());
        loop {
            interval.tick().await;

            let mut failures = 0usize;
            for owner in wallets {
                match self.evaluate_wallet(*owner).await {
                    Ok(report) => self.log_report(&report),
                    Err(e) => {
                        failures += 1;
                        error!(owner = %owner, error = %e, "Wallet evaluation failed");
                    }
                }
            }

            if failures == wallets.len() && !wallets.is_empty() {
                warn!(
                    backoff_secs = self.timing.error_backoff_secs,
                    "Every wallet failed this cycle, backing off"
                );
                tokio::time::sleep(self.timing.error_backoff()).await;
            }
        }
    }

    /// Evaluate one wallet across all configured chains.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn evaluate_wallet(&self, owner: Address) -> Result<WalletReport> {
        let holdings = self.fetch_holdings(owner).await;

        let raw_positions: Vec<_> = holdings
            .iter()
            .filter_map(|snapshot| self.parser.parse(snapshot))
            .collect();

        let prices = self.fetch_prices(&raw_positions).await;

        let mut positions = Vec::with_capacity(raw_positions.len());
        for raw in raw_positions {
            let breakdown = self.engine.evaluate(&raw.supplied, &raw.borrowed, &prices);
            let risk_level = self.classifier.classify(breakdown.health_factor);
            debug!(
                chain = %raw.chain_name,
                health_factor = breakdown.health_factor,
                risk = %risk_level,
                "Position evaluated"
            );
            positions.push(Position::from_raw(owner, raw, breakdown, risk_level));
        }

        let summary = self.aggregator.aggregate(&positions);

        let mut decisions = Vec::new();
        for position in &positions {
            let unresolved = self.store.unresolved(owner, position.chain_id);
            let position_decisions = self.alerts.evaluate(
                owner,
                position.chain_id,
                &position.chain_name,
                position.health_factor,
                &unresolved,
            );
            for decision in &position_decisions {
                self.apply_decision(decision);
            }
            decisions.extend(position_decisions);
        }

        let mut plans = Vec::new();
        for position in positions.iter().filter(|p| p.risk_level.needs_action()) {
            match self.proposer.propose(position, &holdings).await {
                Ok(proposed) => {
                    let actions =
                        self.validator
                            .validate_and_order(&proposed, position.chain_id, &holdings);
                    if !actions.is_empty() {
                        plans.push(ValidatedActionPlan {
                            owner,
                            chain_id: position.chain_id,
                            actions,
                        });
                    }
                }
                Err(e) => {
                    warn!(
                        chain_id = position.chain_id,
                        error = %e,
                        "Proposal generation failed, skipping plan"
                    );
                }
            }
        }

        Ok(WalletReport {
            owner,
            positions,
            summary,
            decisions,
            plans,
        })
    }

    /// Fetch wallet holdings from every configured chain concurrently.
    /// Chains that fail are logged and skipped.
    async fn fetch_holdings(&self, owner: Address) -> Vec<HoldingsSnapshot> {
        let fetches = self
            .endpoints
            .iter()
            .map(|endpoint| self.explorer.tokens_by_address(owner, endpoint));

        join_all(fetches)
            .await
            .into_iter()
            .zip(&self.endpoints)
            .filter_map(|(result, endpoint)| match result {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(
                        chain = %endpoint.chain_name,
                        error = %e,
                        "Holdings fetch failed, skipping chain"
                    );
                    None
                }
            })
            .collect()
    }

    /// One batched price snapshot for every symbol the wallet touches.
    /// A total price failure degrades to an empty snapshot; evaluation
    /// stays total because unpriced assets contribute zero.
    async fn fetch_prices(&self, positions: &[guardian_api::RawPosition]) -> PriceSnapshot {
        let symbols: BTreeSet<String> = positions
            .iter()
            .flat_map(|p| p.supplied.iter().chain(p.borrowed.iter()))
            .map(|a| a.token.clone())
            .collect();
        let symbols: Vec<String> = symbols.into_iter().collect();

        if symbols.is_empty() {
            return PriceSnapshot::default();
        }

        match self.prices.snapshot(&symbols).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Price fetch failed, evaluating without prices");
                PriceSnapshot::default()
            }
        }
    }

    fn apply_decision(&self, decision: &AlertDecision) {
        match decision {
            AlertDecision::Create(alert) => {
                let inserted = self.store.insert_unresolved(alert.clone());
                if inserted {
                    info!(
                        owner = %alert.owner,
                        chain_id = alert.chain_id,
                        alert_type = alert.alert_type.as_str(),
                        health_factor = alert.health_factor_at_creation,
                        "Alert created"
                    );
                } else {
                    debug!(
                        owner = %alert.owner,
                        chain_id = alert.chain_id,
                        alert_type = alert.alert_type.as_str(),
                        "Alert already open, create skipped"
                    );
                }
            }
            AlertDecision::Resolve {
                owner,
                chain_id,
                alert_type,
            } => {
                self.store
                    .resolve(*owner, *chain_id, *alert_type, chrono::Utc::now());
                info!(
                    owner = %owner,
                    chain_id = chain_id,
                    alert_type = alert_type.as_str(),
                    "Alert resolved"
                );
            }
        }
    }

    fn log_report(&self, report: &WalletReport) {
        info!(
            owner = %report.owner,
            positions = report.positions.len(),
            weighted_hf = report.summary.weighted_health_factor,
            risk = %report.summary.overall_risk,
            net_value_usd = report.summary.net_value_usd,
            alerts = report.decisions.len(),
            plans = report.plans.len(),
            "Wallet evaluated"
        );
    }
}

//! Remediation action proposers.
//!
//! The monitor asks a proposer for candidate actions whenever a position
//! needs attention. The trait seam allows an external generator (an LLM
//! advisor, a strategy service) to be plugged in; the built-in
//! [`RuleBasedProposer`] produces deterministic repay/supply proposals from
//! wallet balances alone.

use anyhow::{Context, Result};
use async_trait::async_trait;
use guardian_api::{parse_proposals, ActionType, HoldingsSnapshot, ProposedAction};
use tracing::debug;

use crate::position::Position;

/// Produces candidate remediation actions for one at-risk position.
///
/// Proposals are untrusted; the validator checks feasibility afterwards.
#[async_trait]
pub trait ActionProposer: Send + Sync {
    async fn propose(
        &self,
        position: &Position,
        holdings: &[HoldingsSnapshot],
    ) -> Result<Vec<ProposedAction>>;
}

/// Deterministic proposer that repays part of the largest debt and tops up
/// the largest collateral, capped by what the wallet actually holds.
#[derive(Debug, Clone, Copy)]
pub struct RuleBasedProposer {
    /// Fraction of the largest debt to repay
    repay_fraction: f64,
    /// Fraction of the largest supplied amount to add as collateral
    supply_fraction: f64,
}

impl RuleBasedProposer {
    pub fn new(repay_fraction: f64, supply_fraction: f64) -> Self {
        Self {
            repay_fraction,
            supply_fraction,
        }
    }

    fn wallet_balance(holdings: &[HoldingsSnapshot], chain_id: u64, token: &str) -> f64 {
        holdings
            .iter()
            .filter(|s| s.chain_id == chain_id)
            .map(|s| s.balance_of(token))
            .sum()
    }
}

impl Default for RuleBasedProposer {
    fn default() -> Self {
        Self::new(0.3, 0.2)
    }
}

#[async_trait]
impl ActionProposer for RuleBasedProposer {
    async fn propose(
        &self,
        position: &Position,
        holdings: &[HoldingsSnapshot],
    ) -> Result<Vec<ProposedAction>> {
        let mut actions = Vec::new();

        if let Some(debt) = position.largest_debt() {
            let balance = Self::wallet_balance(holdings, position.chain_id, &debt.token);
            let amount = (debt.amount * self.repay_fraction).min(balance);
            if amount > 0.0 {
                actions.push(ProposedAction {
                    order: 1,
                    action_type: ActionType::Repay,
                    token: debt.token.clone(),
                    amount,
                    src_chain_id: None,
                    dst_chain_id: None,
                    reason: format!(
                        "Repay {} {} to reduce debt and raise the health factor",
                        amount, debt.token
                    ),
                });
            }
        }

        if let Some(collateral) = position.largest_collateral() {
            let balance = Self::wallet_balance(holdings, position.chain_id, &collateral.token);
            let amount = (collateral.amount * self.supply_fraction).min(balance);
            if amount > 0.0 {
                actions.push(ProposedAction {
                    order: 2,
                    action_type: ActionType::Supply,
                    token: collateral.token.clone(),
                    amount,
                    src_chain_id: None,
                    dst_chain_id: None,
                    reason: format!(
                        "Supply {} {} as additional collateral",
                        amount, collateral.token
                    ),
                });
            }
        }

        Ok(actions)
    }
}

/// Source of raw proposal payloads, typically an LLM advisor service.
///
/// The payload is untrusted text; [`GeneratorBackedProposer`] parses it
/// through the proposal schema before anything downstream sees it.
#[async_trait]
pub trait ProposalGenerator: Send + Sync {
    async fn generate(
        &self,
        position: &Position,
        holdings: &[HoldingsSnapshot],
    ) -> Result<String>;
}

/// Proposer backed by an external payload generator.
///
/// A payload that cannot be interpreted at all surfaces as an error;
/// individually malformed actions inside it are dropped by the schema
/// parser. Proposal sets for other chains are ignored.
pub struct GeneratorBackedProposer<G> {
    generator: G,
}

impl<G> GeneratorBackedProposer<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl<G: ProposalGenerator> ActionProposer for GeneratorBackedProposer<G> {
    async fn propose(
        &self,
        position: &Position,
        holdings: &[HoldingsSnapshot],
    ) -> Result<Vec<ProposedAction>> {
        let payload = self
            .generator
            .generate(position, holdings)
            .await
            .context("proposal generator failed")?;

        let sets = parse_proposals(&payload).context("proposal payload was not interpretable")?;

        let actions = sets
            .into_iter()
            .find(|set| set.chain_id == position.chain_id)
            .map(|set| set.actions)
            .unwrap_or_default();

        debug!(
            chain_id = position.chain_id,
            actions = actions.len(),
            "Parsed generated proposals"
        );
        Ok(actions)
    }
}

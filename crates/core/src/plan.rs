//! Action validation and sequencing.
//!
//! Proposed remediation actions arrive unordered and untrusted. The
//! validator checks each one against current wallet holdings, drops
//! anything infeasible, and emits the survivors sorted by their declared
//! execution order. Dropping is silent at the API level; each drop is
//! logged at debug with the reason.

use alloy::primitives::Address;
use guardian_api::{ActionType, HoldingsSnapshot, ProposedAction};
use tracing::debug;

/// An ordered, feasibility-checked batch of actions for one position.
#[derive(Debug, Clone)]
pub struct ValidatedActionPlan {
    /// Owning wallet
    pub owner: Address,
    /// Chain the position lives on
    pub chain_id: u64,
    /// Actions sorted ascending by declared order
    pub actions: Vec<ProposedAction>,
}

impl ValidatedActionPlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Checks proposed actions against wallet holdings and orders them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionValidator;

impl ActionValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a batch of actions against holdings and sort the survivors.
    ///
    /// `position_chain_id` is the chain the position lives on; repay,
    /// supply, and swap are checked against holdings there. Bridge and
    /// transfer are checked against their declared source chain instead.
    /// The sort is stable, so actions sharing an order value keep their
    /// proposal order. Declared order values are preserved as-is, gaps and
    /// duplicates included.
    pub fn validate_and_order(
        &self,
        actions: &[ProposedAction],
        position_chain_id: u64,
        holdings: &[HoldingsSnapshot],
    ) -> Vec<ProposedAction> {
        let mut valid: Vec<ProposedAction> = actions
            .iter()
            .filter(|action| self.is_feasible(action, position_chain_id, holdings))
            .cloned()
            .collect();
        valid.sort_by_key(|a| a.order);
        valid
    }

    fn is_feasible(
        &self,
        action: &ProposedAction,
        position_chain_id: u64,
        holdings: &[HoldingsSnapshot],
    ) -> bool {
        if action.token.is_empty() {
            debug!(order = action.order, "dropping action with empty token");
            return false;
        }
        if !(action.amount > 0.0) {
            debug!(
                order = action.order,
                token = %action.token,
                amount = action.amount,
                "dropping action with non-positive amount"
            );
            return false;
        }

        match action.action_type {
            ActionType::Repay | ActionType::Supply => {
                let balance = balance_on(holdings, position_chain_id, &action.token);
                if balance <= 0.0 {
                    debug!(
                        token = %action.token,
                        chain_id = position_chain_id,
                        "dropping {}: no wallet balance",
                        action.action_type.as_str()
                    );
                    return false;
                }
                if action.amount > balance {
                    debug!(
                        token = %action.token,
                        amount = action.amount,
                        balance,
                        "dropping {}: amount exceeds balance",
                        action.action_type.as_str()
                    );
                    return false;
                }
                true
            }
            // Source balance must exist; the output amount is the venue's
            // concern, not checked here.
            ActionType::Swap => {
                let balance = balance_on(holdings, position_chain_id, &action.token);
                if balance <= 0.0 {
                    debug!(
                        token = %action.token,
                        chain_id = position_chain_id,
                        "dropping swap: no source balance"
                    );
                    return false;
                }
                true
            }
            ActionType::Bridge | ActionType::Transfer => {
                let Some(src_chain_id) = action.src_chain_id else {
                    debug!(
                        token = %action.token,
                        "dropping {}: missing source chain",
                        action.action_type.as_str()
                    );
                    return false;
                };
                let balance = balance_on(holdings, src_chain_id, &action.token);
                if balance <= 0.0 {
                    debug!(
                        token = %action.token,
                        chain_id = src_chain_id,
                        "dropping {}: no balance on source chain",
                        action.action_type.as_str()
                    );
                    return false;
                }
                if action.amount > balance {
                    debug!(
                        token = %action.token,
                        amount = action.amount,
                        balance,
                        "dropping {}: amount exceeds source balance",
                        action.action_type.as_str()
                    );
                    return false;
                }
                true
            }
            // Withdrawals come out of the protocol, not the wallet
            ActionType::Withdraw => true,
        }
    }
}

fn balance_on(holdings: &[HoldingsSnapshot], chain_id: u64, token: &str) -> f64 {
    holdings
        .iter()
        .filter(|snapshot| snapshot.chain_id == chain_id)
        .map(|snapshot| snapshot.balance_of(token))
        .sum()
}

//! Remediation-action proposal schema.
//!
//! Proposals are produced by an external generator (typically an LLM
//! advisor) and are untrusted: the payload may arrive wrapped in markdown
//! fences, individual actions may be malformed, chain IDs may be strings.
//! Only the schema matters here; feasibility checks live in the core
//! validator.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Kind of remediation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Pay down borrowed debt
    Repay,
    /// Add collateral
    Supply,
    /// Swap tokens on the position's chain
    Swap,
    /// Withdraw excess collateral
    Withdraw,
    /// Move tokens between chains (wallet transfer)
    Transfer,
    /// Bridge tokens across chains
    Bridge,
}

impl ActionType {
    /// Snake-case name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repay => "repay",
            Self::Supply => "supply",
            Self::Swap => "swap",
            Self::Withdraw => "withdraw",
            Self::Transfer => "transfer",
            Self::Bridge => "bridge",
        }
    }
}

/// A single proposed remediation action, untrusted until validated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProposedAction {
    /// Declared execution order (ascending)
    pub order: u32,
    /// What to do
    pub action_type: ActionType,
    /// Token symbol the action operates on (source token for swaps)
    pub token: String,
    /// Token quantity
    pub amount: f64,
    /// Source chain for bridge/transfer actions
    #[serde(default, deserialize_with = "de_opt_chain_id")]
    pub src_chain_id: Option<u64>,
    /// Destination chain for bridge/transfer actions
    #[serde(default, deserialize_with = "de_opt_chain_id")]
    pub dst_chain_id: Option<u64>,
    /// Generator's explanation
    #[serde(default)]
    pub reason: String,
}

/// Proposed actions for one position, keyed by chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalSet {
    /// Chain the position lives on
    pub chain_id: u64,
    /// Actions for that position, as proposed
    pub actions: Vec<ProposedAction>,
}

/// Error for a payload that cannot be interpreted at all.
///
/// Individually malformed actions inside a well-formed payload are dropped,
/// not errors.
#[derive(Debug, Error)]
pub enum ProposalError {
    #[error("malformed proposal payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parse a generator payload into per-position proposal sets.
///
/// The overall payload must be a JSON array of position entries; anything
/// else is a [`ProposalError`]. Within an entry, actions that fail to parse
/// (unknown `action_type`, missing fields) are silently dropped.
pub fn parse_proposals(payload: &str) -> Result<Vec<ProposalSet>, ProposalError> {
    let stripped = strip_code_fences(payload);
    let raw: Vec<RawProposalSet> = serde_json::from_str(stripped)?;

    Ok(raw
        .into_iter()
        .map(|set| {
            let actions = set
                .actions
                .into_iter()
                .filter_map(|value| match serde_json::from_value::<ProposedAction>(value) {
                    Ok(action) => Some(action),
                    Err(e) => {
                        debug!(chain = set.chain_id, error = %e, "Dropping malformed proposed action");
                        None
                    }
                })
                .collect();

            ProposalSet {
                chain_id: set.chain_id,
                actions,
            }
        })
        .collect())
}

/// Generators often wrap JSON in markdown code fences; strip them.
fn strip_code_fences(payload: &str) -> &str {
    let trimmed = payload.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

#[derive(Debug, Deserialize)]
struct RawProposalSet {
    #[serde(deserialize_with = "de_chain_id")]
    chain_id: u64,
    #[serde(default)]
    actions: Vec<Value>,
}

/// Chain IDs arrive as either numbers or decimal strings.
fn de_chain_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn de_opt_chain_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Num(n)) => Ok(Some(n)),
        Some(Raw::Str(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

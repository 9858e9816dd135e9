//! Guardian API clients for external services.
//!
//! This crate provides the external collaborators of the risk engine:
//! - Blockscout explorer: wallet token balances per chain
//! - CoinGecko: USD price snapshots
//! - Position parsing: lending positions from receipt-token balances
//! - Proposal schema: untrusted remediation-action payloads

mod explorer;
mod positions;
mod prices;
mod proposal;

pub use explorer::{ChainEndpoint, ExplorerClient, HoldingsSnapshot, HoldingsSource, TokenHolding};
pub use positions::{borrowed_base, supplied_base, AssetAmount, PositionParser, RawPosition};
pub use prices::{PriceClient, PriceSnapshot, PriceSource};
pub use proposal::{parse_proposals, ActionType, ProposalError, ProposalSet, ProposedAction};

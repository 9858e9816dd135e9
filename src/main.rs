//! Guardian position monitor
//!
//! Watches collateralized lending positions across multiple EVM testnets:
//! - Parses positions from receipt-token balances via Blockscout
//! - Scores them with the Aave health factor formula
//! - Raises and resolves risk alerts with hysteresis
//! - Proposes and validates remediation plans for at-risk positions

use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use guardian_api::{ExplorerClient, PriceClient};
use guardian_core::{
    AlertLifecycleManager, AssetRiskTable, GuardianConfig, HealthFactorEngine, InMemoryAlertStore,
    PositionMonitor, RiskClassifier, RuleBasedProposer,
};

/// Environment variable names.
mod env {
    pub const WALLETS: &str = "GUARDIAN_WALLETS";
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,guardian_core=debug,guardian_api=debug")),
        )
        .init();

    // Use GUARDIAN_PROFILE env var to select: default, or a TOML file path
    let config = GuardianConfig::from_env()?;
    config.validate()?;
    config.log_config();

    let wallets = load_wallets()?;
    info!(wallets = wallets.len(), "Monitoring wallets");

    let monitor = build_monitor(&config);
    monitor.run(&wallets).await
}

/// Comma-separated wallet addresses from the environment.
fn load_wallets() -> Result<Vec<Address>> {
    let raw = std::env::var(env::WALLETS)
        .map_err(|_| anyhow::anyhow!("Missing env var: {}", env::WALLETS))?;

    let wallets: Vec<Address> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .with_context(|| format!("invalid wallet address: {s}"))
        })
        .collect::<Result<_>>()?;

    if wallets.is_empty() {
        anyhow::bail!("{} is set but contains no addresses", env::WALLETS);
    }
    Ok(wallets)
}

fn build_monitor(config: &GuardianConfig) -> PositionMonitor {
    let classifier = RiskClassifier::new(config.risk);
    let engine = HealthFactorEngine::new(Arc::new(AssetRiskTable::new()));
    let alerts = AlertLifecycleManager::new(config.risk, config.resolve);
    let endpoints = config.chains.iter().map(|c| c.endpoint()).collect();

    PositionMonitor::new(
        Arc::new(ExplorerClient::new()),
        Arc::new(PriceClient::new()),
        engine,
        classifier,
        alerts,
        Arc::new(InMemoryAlertStore::new()),
        Arc::new(RuleBasedProposer::default()),
        endpoints,
        config.monitor,
    )
}

/// Print startup banner.
fn print_banner() {
    println!(
        r#"
    ╔═╗┬ ┬┌─┐┬─┐┌┬┐┬┌─┐┌┐┌
    ║ ╦│ │├─┤├┬┘ ││├─┤│││
    ╚═╝└─┘┴ ┴┴└──┴┘┴ ┴┘└┘
    Position Monitor v0.1.0
    "#
    );
}

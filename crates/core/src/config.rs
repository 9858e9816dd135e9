//! Runtime configuration.
//!
//! Configuration comes from an optional TOML file selected by the
//! `GUARDIAN_PROFILE` environment variable; every field has a default so
//! the monitor runs with no file at all. Thresholds are validated for
//! ordering at startup rather than trusted blindly.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use guardian_api::ChainEndpoint;
use serde::Deserialize;
use tracing::info;

use crate::alerts::ResolveThresholds;
use crate::risk::RiskBands;

/// One monitored chain.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// EVM chain ID
    pub chain_id: u64,
    /// Human-readable name
    pub name: String,
    /// Blockscout API base URL (v2)
    pub explorer_url: String,
}

impl ChainConfig {
    pub fn endpoint(&self) -> ChainEndpoint {
        ChainEndpoint {
            chain_id: self.chain_id,
            chain_name: self.name.clone(),
            base_url: self.explorer_url.clone(),
        }
    }
}

fn default_chains() -> Vec<ChainConfig> {
    let chains = [
        (11155111, "Sepolia", "https://eth-sepolia.blockscout.com/api/v2"),
        (84532, "Base Sepolia", "https://base-sepolia.blockscout.com/api/v2"),
        (
            421614,
            "Arbitrum Sepolia",
            "https://arbitrum-sepolia.blockscout.com/api/v2",
        ),
        (
            11155420,
            "Optimism Sepolia",
            "https://optimism-sepolia.blockscout.com/api/v2",
        ),
    ];
    chains
        .into_iter()
        .map(|(chain_id, name, explorer_url)| ChainConfig {
            chain_id,
            name: name.to_string(),
            explorer_url: explorer_url.to_string(),
        })
        .collect()
}

/// Monitoring loop timing.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MonitorTimingConfig {
    /// Seconds between evaluation cycles
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// Extra delay after a cycle that failed outright
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
}

fn default_cycle_interval_secs() -> u64 {
    120
}
fn default_error_backoff_secs() -> u64 {
    60
}

impl MonitorTimingConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

impl Default for MonitorTimingConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: default_cycle_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GuardianConfig {
    /// Profile name, for logs only
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Health factor band boundaries
    #[serde(default)]
    pub risk: RiskBands,

    /// Alert recovery thresholds
    #[serde(default)]
    pub resolve: ResolveThresholds,

    /// Loop timing
    #[serde(default)]
    pub monitor: MonitorTimingConfig,

    /// Chains to monitor
    #[serde(default = "default_chains")]
    pub chains: Vec<ChainConfig>,
}

fn default_profile() -> String {
    "default".to_string()
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            risk: RiskBands::default(),
            resolve: ResolveThresholds::default(),
            monitor: MonitorTimingConfig::default(),
            chains: default_chains(),
        }
    }
}

impl GuardianConfig {
    /// Load from the profile named by `GUARDIAN_PROFILE`.
    ///
    /// Unset or `default` means built-in defaults; any other value is
    /// treated as a path to a TOML file.
    pub fn from_env() -> Result<Self> {
        match std::env::var("GUARDIAN_PROFILE") {
            Ok(profile) if profile != "default" => Self::from_file(&profile),
            _ => Ok(Self::default()),
        }
    }

    /// Load from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("parsing config file {path}"))?;
        Ok(config)
    }

    /// Reject threshold orderings that would break classification or
    /// hysteresis.
    pub fn validate(&self) -> Result<()> {
        let bands = &self.risk;
        if !(bands.safe > bands.warning && bands.warning > bands.danger) {
            bail!(
                "risk bands must be strictly decreasing: safe {} > warning {} > danger {}",
                bands.safe,
                bands.warning,
                bands.danger
            );
        }
        if bands.liquidation > bands.danger {
            bail!(
                "liquidation bound {} must not exceed the danger bound {}",
                bands.liquidation,
                bands.danger
            );
        }
        if self.resolve.liquidation_risk <= bands.danger {
            bail!(
                "liquidation_risk resolve threshold {} must exceed the danger bound {}",
                self.resolve.liquidation_risk,
                bands.danger
            );
        }
        if self.resolve.health_factor <= bands.warning {
            bail!(
                "health_factor resolve threshold {} must exceed the warning bound {}",
                self.resolve.health_factor,
                bands.warning
            );
        }
        if self.chains.is_empty() {
            bail!("at least one chain must be configured");
        }
        if self.monitor.cycle_interval_secs == 0 {
            bail!("cycle_interval_secs must be positive");
        }
        Ok(())
    }

    /// Log the effective configuration at startup.
    pub fn log_config(&self) {
        info!(profile = %self.profile, "Configuration loaded");
        info!(
            safe = self.risk.safe,
            warning = self.risk.warning,
            danger = self.risk.danger,
            liquidation = self.risk.liquidation,
            "Risk bands"
        );
        info!(
            health_factor = self.resolve.health_factor,
            liquidation_risk = self.resolve.liquidation_risk,
            "Alert resolve thresholds"
        );
        info!(
            cycle_interval_secs = self.monitor.cycle_interval_secs,
            error_backoff_secs = self.monitor.error_backoff_secs,
            "Monitor timing"
        );
        for chain in &self.chains {
            info!(
                chain_id = chain.chain_id,
                name = %chain.name,
                explorer = %chain.explorer_url,
                "Monitoring chain"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GuardianConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chains.len(), 4);
        assert_eq!(config.monitor.cycle_interval(), Duration::from_secs(120));
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let raw = r#"
            profile = "aggressive"

            [risk]
            safe = 1.8
            warning = 1.4

            [monitor]
            cycle_interval_secs = 30

            [[chains]]
            chain_id = 11155111
            name = "Sepolia"
            explorer_url = "https://eth-sepolia.blockscout.com/api/v2"
        "#;

        let config: GuardianConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.profile, "aggressive");
        assert_eq!(config.risk.safe, 1.8);
        // Unset fields keep their defaults
        assert_eq!(config.risk.danger, 1.25);
        assert_eq!(config.monitor.cycle_interval_secs, 30);
        assert_eq!(config.monitor.error_backoff_secs, 60);
        assert_eq!(config.chains.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_misordered_bands_rejected() {
        let mut config = GuardianConfig::default();
        config.risk.warning = 2.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_threshold_must_exceed_creation_bound() {
        let mut config = GuardianConfig::default();
        config.resolve.liquidation_risk = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_chains_rejected() {
        let mut config = GuardianConfig::default();
        config.chains.clear();
        assert!(config.validate().is_err());
    }
}

//! Configuration for the ledger

use crate::heuristics::{SurveillanceConfig, ThrottleConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Mining configuration
    pub mining: MiningConfig,

    /// Transfer configuration
    pub transfers: TransferConfig,

    /// Purchase-throttle configuration
    pub throttle: ThrottleConfig,

    /// Transfer-surveillance configuration
    pub surveillance: SurveillanceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "ticket-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            mining: MiningConfig::default(),
            transfers: TransferConfig::default(),
            throttle: ThrottleConfig::default(),
            surveillance: SurveillanceConfig::default(),
        }
    }
}

/// Mining configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Leading zero characters a block digest must carry to be sealed.
    /// Expected sealing work grows as 16^difficulty; tests run at 0-2.
    pub difficulty: usize,

    /// Fixed reward credited to the miner per sealed block
    pub reward: Decimal,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: 2,
            reward: Decimal::from(10),
        }
    }
}

/// Transfer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Hours a pending transfer stays confirmable
    pub pending_ttl_hours: i64,

    /// Cooldown in hours applied to events at creation; 0 disables the
    /// cooldown check
    pub default_cooldown_hours: i64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            pending_ttl_hours: 24,
            default_cooldown_hours: 0,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(difficulty) = std::env::var("LEDGER_DIFFICULTY") {
            config.mining.difficulty = difficulty
                .parse()
                .map_err(|e| crate::Error::Config(format!("invalid LEDGER_DIFFICULTY: {}", e)))?;
        }

        if let Ok(ttl) = std::env::var("LEDGER_PENDING_TTL_HOURS") {
            config.transfers.pending_ttl_hours = ttl.parse().map_err(|e| {
                crate::Error::Config(format!("invalid LEDGER_PENDING_TTL_HOURS: {}", e))
            })?;
        }

        if let Ok(cooldown) = std::env::var("LEDGER_COOLDOWN_HOURS") {
            config.transfers.default_cooldown_hours = cooldown.parse().map_err(|e| {
                crate::Error::Config(format!("invalid LEDGER_COOLDOWN_HOURS: {}", e))
            })?;
        }

        Ok(config)
    }
}

//! Configuration management for database and application settings.
//!
//! Settings load from an optional TOML file (path in `AJO_CONFIG`), with
//! environment variables overriding individual values. Everything has a
//! sensible default so the application runs with no configuration at all.

use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SeaORM connection URL for the embedded database
    pub database_url: String,
    /// Commission rate applied to every contribution and payout (e.g. 0.01)
    pub commission_rate: Decimal,
    /// Smallest accepted gross amount
    pub min_amount: Decimal,
    /// Largest accepted gross amount
    pub max_amount: Decimal,
    /// Seconds between background reconciliation drains
    pub sync_interval_secs: u64,
    /// Per-record timeout for gateway calls during a drain, in seconds
    pub gateway_timeout_secs: u64,
    /// Minimum accepted password length at registration
    pub min_password_length: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/ajo_ledger.sqlite?mode=rwc".to_string(),
            // 1% commission
            commission_rate: Decimal::new(1, 2),
            min_amount: Decimal::from(1_000),
            max_amount: Decimal::from(10_000_000),
            sync_interval_secs: 300,
            gateway_timeout_secs: 30,
            min_password_length: 6,
        }
    }
}

impl AppConfig {
    /// Interval between periodic reconciliation drains.
    #[must_use]
    pub const fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// Bound on a single gateway call during a drain.
    #[must_use]
    pub const fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Checks a gross amount against the configured limits.
    pub fn validate_gross(&self, gross: Decimal) -> Result<()> {
        crate::commission::validate_amount(gross)?;
        if gross < self.min_amount || gross > self.max_amount {
            return Err(Error::Validation {
                message: format!(
                    "amount {gross} outside allowed range [{}, {}]",
                    self.min_amount, self.max_amount
                ),
            });
        }
        Ok(())
    }
}

/// Loads configuration from the `AJO_CONFIG` TOML file (if set) and applies
/// environment variable overrides.
pub fn load() -> Result<AppConfig> {
    let mut config = match std::env::var("AJO_CONFIG") {
        Ok(path) => {
            info!("Loading configuration from {path}");
            let raw = std::fs::read_to_string(&path)?;
            toml::from_str(&raw).map_err(|e| Error::Config {
                message: format!("failed to parse {path}: {e}"),
            })?
        }
        Err(_) => {
            debug!("AJO_CONFIG not set, using defaults");
            AppConfig::default()
        }
    };

    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database_url = url;
    }
    if let Ok(rate) = std::env::var("AJO_COMMISSION_RATE") {
        config.commission_rate = Decimal::from_str(&rate).map_err(|e| Error::Config {
            message: format!("invalid AJO_COMMISSION_RATE '{rate}': {e}"),
        })?;
    }

    if config.commission_rate < Decimal::ZERO || config.commission_rate >= Decimal::ONE {
        return Err(Error::Config {
            message: format!(
                "commission rate must be in [0, 1), got {}",
                config.commission_rate
            ),
        });
    }

    Ok(config)
}

// src/config.rs

use crate::utils::interval::parse_interval;
use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StrategyConfig {
    /// Stop loss fires when the loss since entry is below `avg_down * stop_loss_multiplier`.
    pub stop_loss_multiplier: Decimal,
    #[serde(default = "default_threshold_factor")]
    pub entry_factor: Decimal,
    #[serde(default = "default_threshold_factor")]
    pub take_profit_factor: Decimal,
    /// Obsolete pairs are closed once the gain covers this many fees.
    #[serde(default = "default_obsolete_fee_multiple")]
    pub obsolete_fee_multiple: Decimal,
    #[serde(default = "default_volume_window")]
    pub volume_window: usize,
    #[serde(default)]
    pub require_volume_confirmation: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_venue")]
    pub venue: String,
    pub base_asset: String,
    pub trade_notional: Decimal,
    pub signal_interval: String,
    #[serde(default = "default_candle_limit")]
    pub candle_limit: usize,
    pub cycle_interval: String,
    #[serde(default = "default_starting_balance")]
    pub starting_balance: Decimal,
    #[serde(default = "default_market_file")]
    pub market_file: PathBuf,
    #[serde(default = "default_balance_file")]
    pub balance_file: PathBuf,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_candle_retries")]
    pub candle_retries: u32,
    #[serde(default)]
    pub discord_webhook: Option<String>,
    pub strategy: StrategyConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("Settings").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"));

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trade_notional <= Decimal::ZERO {
            return Err(ConfigError::Message(
                "trade_notional must be positive".to_string(),
            ));
        }
        if self.base_asset.trim().is_empty() {
            return Err(ConfigError::Message("base_asset is empty".to_string()));
        }
        if self.candle_limit < 2 {
            return Err(ConfigError::Message(
                "candle_limit must be at least 2".to_string(),
            ));
        }
        if self.strategy.volume_window == 0 {
            return Err(ConfigError::Message(
                "strategy.volume_window must be at least 1".to_string(),
            ));
        }
        parse_interval(&self.signal_interval).map_err(|e| ConfigError::Message(e.to_string()))?;
        self.cycle_duration()?;
        Ok(())
    }

    pub fn cycle_duration(&self) -> Result<Duration, ConfigError> {
        parse_interval(&self.cycle_interval).map_err(|e| ConfigError::Message(e.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_threshold_factor() -> Decimal {
    Decimal::new(8, 1)
}

fn default_obsolete_fee_multiple() -> Decimal {
    Decimal::TWO
}

fn default_volume_window() -> usize {
    2
}

fn default_venue() -> String {
    "binance".to_string()
}

fn default_candle_limit() -> usize {
    50
}

fn default_starting_balance() -> Decimal {
    Decimal::from(1000)
}

fn default_market_file() -> PathBuf {
    PathBuf::from("data/markets.json")
}

fn default_balance_file() -> PathBuf {
    PathBuf::from("data/balances.json")
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_candle_retries() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const SAMPLE: &str = r#"
        base_asset = "USDT"
        trade_notional = "100"
        signal_interval = "1h"
        cycle_interval = "5m"

        [strategy]
        stop_loss_multiplier = "1.5"
    "#;

    fn load(toml: &str) -> Result<AppConfig, ConfigError> {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn fills_defaults() {
        let config = load(SAMPLE).unwrap();
        assert_eq!(config.venue, "binance");
        assert_eq!(config.candle_limit, 50);
        assert_eq!(config.starting_balance, Decimal::from(1000));
        assert_eq!(config.strategy.entry_factor, Decimal::new(8, 1));
        assert_eq!(config.strategy.obsolete_fee_multiple, Decimal::TWO);
        assert_eq!(config.strategy.volume_window, 2);
        assert!(!config.strategy.require_volume_confirmation);
        assert_eq!(config.cycle_duration().unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn rejects_non_positive_notional() {
        let toml = SAMPLE.replace(r#"trade_notional = "100""#, r#"trade_notional = "0""#);
        assert!(load(&toml).is_err());
    }

    #[test]
    fn rejects_bad_cycle_interval() {
        let toml = SAMPLE.replace(r#"cycle_interval = "5m""#, r#"cycle_interval = "soon""#);
        assert!(load(&toml).is_err());
    }
}

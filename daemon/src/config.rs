use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Result};
use clap::Parser;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lottery_common::{
    config::{DEFAULT_BASE_FEE, DEFAULT_GAS_PRICE_LINK, DEFAULT_SUBSCRIPTION_FUND_AMOUNT},
    crypto::Address,
    network::Network,
    time::TimestampSeconds,
    utils::{format_coin, from_coin},
};

use crate::{logger::LogLevel, node::DeploymentSettings};

/// Default values for configuration
pub mod defaults {
    use super::*;

    pub const LOG_LEVEL: LogLevel = LogLevel::Info;
    pub const FILENAME_LOG: &str = "lottery.log";
    pub const LOGS_PATH: &str = "logs/";
    pub const STORAGE_PATH: &str = "storage/";

    pub const KEEPER_POLL_INTERVAL_MS: u64 = 1000;
    pub const ORACLE_POLL_INTERVAL_MS: u64 = 1000;
    pub const SAVE_INTERVAL_SECS: u64 = 10;

    pub const SIMULATED_ENTRY_INTERVAL_MS: u64 = 2000;
    // Ten coins per simulated player
    pub const SIMULATED_PLAYER_FUNDS: u64 = 10 * lottery_common::config::COIN_VALUE;

    // Validation limits
    pub const MIN_POLL_INTERVAL_MS: u64 = 10;
    pub const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;
    pub const MAX_CALLBACK_GAS_LIMIT: u32 = 2_500_000;
    pub const MAX_SIMULATED_PLAYERS: usize = 10_000;
}

/// Node configuration, loaded from the command line or a JSON file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedConfig {
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    #[serde(default)]
    pub disable_file_logging: bool,

    #[serde(default)]
    pub disable_log_color: bool,

    #[serde(default = "default_filename_log")]
    pub filename_log: String,

    #[serde(default = "default_logs_path")]
    pub logs_path: String,

    #[serde(default = "default_storage_path")]
    pub storage_path: String,

    /// Run without saving or loading snapshots
    #[serde(default)]
    pub disable_storage: bool,

    #[serde(default)]
    pub network: Network,

    /// Account deploying the coordinator and the lottery
    #[serde(default)]
    pub deployer: Option<Address>,

    /// Overrides of the network preset
    #[serde(default)]
    pub entrance_fee: Option<u64>,
    #[serde(default)]
    pub interval: Option<TimestampSeconds>,
    #[serde(default)]
    pub callback_gas_limit: Option<u32>,

    /// Coordinator pricing, in LINK atomic units
    #[serde(default = "default_base_fee")]
    pub base_fee: u64,
    #[serde(default = "default_gas_price_link")]
    pub gas_price_link: u64,
    #[serde(default = "default_subscription_fund_amount")]
    pub subscription_fund_amount: u64,
    /// Added by the oracle when the subscription cannot pay, 0 disables
    #[serde(default = "default_subscription_fund_amount")]
    pub subscription_top_up_amount: u64,

    #[serde(default = "default_keeper_poll_interval_ms")]
    pub keeper_poll_interval_ms: u64,
    #[serde(default = "default_oracle_poll_interval_ms")]
    pub oracle_poll_interval_ms: u64,
    /// Defaults to the block confirmations of the network preset
    #[serde(default)]
    pub fulfillment_delay_secs: Option<u64>,
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,

    #[serde(default)]
    pub simulated_players: usize,
    #[serde(default = "default_simulated_entry_interval_ms")]
    pub simulated_entry_interval_ms: u64,
    #[serde(default = "default_simulated_player_funds")]
    pub simulated_player_funds: u64,

    #[serde(default)]
    pub auto_fix_config: bool,

    #[serde(default)]
    pub strict_validation: bool,
}

// Default functions for serde
fn default_log_level() -> LogLevel {
    defaults::LOG_LEVEL
}
fn default_filename_log() -> String {
    defaults::FILENAME_LOG.to_string()
}
fn default_logs_path() -> String {
    defaults::LOGS_PATH.to_string()
}
fn default_storage_path() -> String {
    defaults::STORAGE_PATH.to_string()
}
fn default_base_fee() -> u64 {
    DEFAULT_BASE_FEE
}
fn default_gas_price_link() -> u64 {
    DEFAULT_GAS_PRICE_LINK
}
fn default_subscription_fund_amount() -> u64 {
    DEFAULT_SUBSCRIPTION_FUND_AMOUNT
}
fn default_keeper_poll_interval_ms() -> u64 {
    defaults::KEEPER_POLL_INTERVAL_MS
}
fn default_oracle_poll_interval_ms() -> u64 {
    defaults::ORACLE_POLL_INTERVAL_MS
}
fn default_save_interval_secs() -> u64 {
    defaults::SAVE_INTERVAL_SECS
}
fn default_simulated_entry_interval_ms() -> u64 {
    defaults::SIMULATED_ENTRY_INTERVAL_MS
}
fn default_simulated_player_funds() -> u64 {
    defaults::SIMULATED_PLAYER_FUNDS
}

impl Default for ValidatedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            disable_file_logging: false,
            disable_log_color: false,
            filename_log: default_filename_log(),
            logs_path: default_logs_path(),
            storage_path: default_storage_path(),
            disable_storage: false,
            network: Network::default(),
            deployer: None,
            entrance_fee: None,
            interval: None,
            callback_gas_limit: None,
            base_fee: default_base_fee(),
            gas_price_link: default_gas_price_link(),
            subscription_fund_amount: default_subscription_fund_amount(),
            subscription_top_up_amount: default_subscription_fund_amount(),
            keeper_poll_interval_ms: default_keeper_poll_interval_ms(),
            oracle_poll_interval_ms: default_oracle_poll_interval_ms(),
            fulfillment_delay_secs: None,
            save_interval_secs: default_save_interval_secs(),
            simulated_players: 0,
            simulated_entry_interval_ms: default_simulated_entry_interval_ms(),
            simulated_player_funds: default_simulated_player_funds(),
            auto_fix_config: true,
            strict_validation: false,
        }
    }
}

impl ValidatedConfig {
    pub fn to_deployment_settings(&self) -> DeploymentSettings {
        let mut settings = DeploymentSettings::new(self.network);
        if let Some(deployer) = self.deployer {
            settings.deployer = deployer;
        }
        settings.entrance_fee = self.entrance_fee;
        settings.interval = self.interval;
        settings.callback_gas_limit = self.callback_gas_limit;
        settings.base_fee = self.base_fee;
        settings.gas_price_link = self.gas_price_link;
        settings.subscription_fund_amount = self.subscription_fund_amount;
        settings
    }

    pub fn keeper_poll_interval(&self) -> Duration {
        Duration::from_millis(self.keeper_poll_interval_ms)
    }

    pub fn oracle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.oracle_poll_interval_ms)
    }

    /// Seconds the oracle waits before answering a request
    pub fn fulfillment_delay(&self) -> TimestampSeconds {
        self.fulfillment_delay_secs
            .unwrap_or(self.network.preset().block_confirmations)
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    pub fn simulated_entry_interval(&self) -> Duration {
        Duration::from_millis(self.simulated_entry_interval_ms)
    }

    /// Validate and load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P, strict_mode: bool, auto_fix: bool) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            anyhow!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            )
        })?;

        let mut config: ValidatedConfig = serde_json::from_str(&content).map_err(|e| {
            anyhow!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            )
        })?;

        let validator = ConfigValidator::new(strict_mode, auto_fix);
        let messages = validator.validate(&mut config)?;
        if !messages.is_empty() && log::log_enabled!(log::Level::Info) {
            info!(
                "Configuration loaded with {} adjustments/warnings",
                messages.len()
            );
        }

        Ok(config)
    }

    /// Write the default configuration as a JSON template
    pub fn generate_template<P: AsRef<Path>>(path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(&ValidatedConfig::default())?;
        std::fs::write(&path, content).map_err(|e| {
            anyhow!(
                "Failed to write config template '{}': {}",
                path.as_ref().display(),
                e
            )
        })?;
        Ok(())
    }
}

/// Command line interface of the node
#[derive(Parser, Clone, Debug)]
#[command(name = "lottery_daemon")]
#[command(about = "Local lottery node with VRF coordinator mock, keeper and oracle")]
#[command(styles = lottery_common::get_cli_styles())]
pub struct CliConfig {
    /// Set log level
    #[clap(long, value_enum, default_value_t = defaults::LOG_LEVEL)]
    pub log_level: LogLevel,

    /// Disable the log file
    #[clap(long)]
    pub disable_file_logging: bool,

    /// Disable the usage of colors in log
    #[clap(long)]
    pub disable_log_color: bool,

    /// Log filename
    #[clap(long, default_value_t = String::from(defaults::FILENAME_LOG))]
    pub filename_log: String,

    /// Logs directory
    #[clap(long, default_value_t = String::from(defaults::LOGS_PATH))]
    pub logs_path: String,

    /// Directory holding the node snapshot
    #[clap(long, default_value_t = String::from(defaults::STORAGE_PATH))]
    pub storage_path: String,

    /// Do not save or load snapshots
    #[clap(long)]
    pub disable_storage: bool,

    /// Network to deploy on
    #[clap(long, value_enum, default_value_t = Network::Devnet)]
    pub network: Network,

    /// Deployer account
    #[clap(long)]
    pub deployer: Option<Address>,

    /// Entrance fee in coins (e.g. 0.1), defaults to the network preset
    #[clap(long, value_parser = parse_coin_amount)]
    pub entrance_fee: Option<u64>,

    /// Round interval in seconds, defaults to the network preset
    #[clap(long)]
    pub interval: Option<TimestampSeconds>,

    /// Gas budget of the fulfillment callback, defaults to the network preset
    #[clap(long)]
    pub callback_gas_limit: Option<u32>,

    /// Coordinator base fee in LINK atomic units
    #[clap(long, default_value_t = DEFAULT_BASE_FEE)]
    pub base_fee: u64,

    /// Coordinator LINK price per gas unit
    #[clap(long, default_value_t = DEFAULT_GAS_PRICE_LINK)]
    pub gas_price_link: u64,

    /// LINK funded to the subscription at deployment
    #[clap(long, default_value_t = DEFAULT_SUBSCRIPTION_FUND_AMOUNT)]
    pub subscription_fund_amount: u64,

    /// LINK added when the subscription cannot pay a fulfillment, 0 disables
    #[clap(long, default_value_t = DEFAULT_SUBSCRIPTION_FUND_AMOUNT)]
    pub subscription_top_up_amount: u64,

    /// Keeper polling interval in milliseconds
    #[clap(long, default_value_t = defaults::KEEPER_POLL_INTERVAL_MS)]
    pub keeper_poll_interval_ms: u64,

    /// Oracle polling interval in milliseconds
    #[clap(long, default_value_t = defaults::ORACLE_POLL_INTERVAL_MS)]
    pub oracle_poll_interval_ms: u64,

    /// Seconds a request waits before the oracle answers it,
    /// defaults to the network block confirmations
    #[clap(long)]
    pub fulfillment_delay_secs: Option<u64>,

    /// Snapshot interval in seconds
    #[clap(long, default_value_t = defaults::SAVE_INTERVAL_SECS)]
    pub save_interval_secs: u64,

    /// Number of simulated players entering the lottery
    #[clap(long, default_value_t = 0)]
    pub simulated_players: usize,

    /// Milliseconds between two simulated entries
    #[clap(long, default_value_t = defaults::SIMULATED_ENTRY_INTERVAL_MS)]
    pub simulated_entry_interval_ms: u64,

    /// Funds minted to each simulated player, in atomic units
    #[clap(long, default_value_t = defaults::SIMULATED_PLAYER_FUNDS)]
    pub simulated_player_funds: u64,

    /// Enable strict configuration validation
    #[clap(long)]
    pub strict_validation: bool,

    /// Disable auto-fix of configuration issues
    #[clap(long)]
    pub no_auto_fix: bool,

    /// JSON File to load the configuration from
    #[clap(long)]
    pub config_file: Option<String>,

    /// Generate the template at the `config_file` path
    #[clap(long)]
    pub generate_config_template: bool,
}

impl CliConfig {
    /// Convert CLI configuration to ValidatedConfig
    pub fn to_validated_config(self) -> ValidatedConfig {
        ValidatedConfig {
            log_level: self.log_level,
            disable_file_logging: self.disable_file_logging,
            disable_log_color: self.disable_log_color,
            filename_log: self.filename_log,
            logs_path: self.logs_path,
            storage_path: self.storage_path,
            disable_storage: self.disable_storage,
            network: self.network,
            deployer: self.deployer,
            entrance_fee: self.entrance_fee,
            interval: self.interval,
            callback_gas_limit: self.callback_gas_limit,
            base_fee: self.base_fee,
            gas_price_link: self.gas_price_link,
            subscription_fund_amount: self.subscription_fund_amount,
            subscription_top_up_amount: self.subscription_top_up_amount,
            keeper_poll_interval_ms: self.keeper_poll_interval_ms,
            oracle_poll_interval_ms: self.oracle_poll_interval_ms,
            fulfillment_delay_secs: self.fulfillment_delay_secs,
            save_interval_secs: self.save_interval_secs,
            simulated_players: self.simulated_players,
            simulated_entry_interval_ms: self.simulated_entry_interval_ms,
            simulated_player_funds: self.simulated_player_funds,
            auto_fix_config: !self.no_auto_fix,
            strict_validation: self.strict_validation,
        }
    }
}

fn parse_coin_amount(value: &str) -> std::result::Result<u64, String> {
    from_coin(value).ok_or_else(|| format!("'{}' is not a valid coin amount", value))
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("Network {0} has no local coordinator, only development networks can run locally")]
    UnsupportedNetwork(Network),

    #[error("Invalid {field}: {value} ms - must be between {min} and {max} ms")]
    InvalidPollInterval {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("Invalid callback gas limit: {value} - must be between 1 and {max}")]
    InvalidCallbackGasLimit { value: u32, max: u32 },

    #[error("Subscription fund {fund} does not cover one fulfillment costing {payment}")]
    UnderfundedSubscription { fund: u64, payment: u64 },

    #[error("Too many simulated players: {value} - maximum is {max}")]
    TooManySimulatedPlayers { value: usize, max: usize },

    #[error("Save interval must be at least one second")]
    InvalidSaveInterval,

    #[error("Invalid {field}: '{path}' - {reason}")]
    InvalidPath {
        field: &'static str,
        path: String,
        reason: String,
    },
}

/// Configuration validation result
pub type ValidationResult<T> = std::result::Result<T, ConfigValidationError>;

/// Configuration validator
pub struct ConfigValidator {
    strict_mode: bool,
    auto_fix: bool,
}

impl ConfigValidator {
    pub fn new(strict_mode: bool, auto_fix: bool) -> Self {
        Self {
            strict_mode,
            auto_fix,
        }
    }

    fn can_fix(&self) -> bool {
        self.auto_fix && !self.strict_mode
    }

    /// Validate the entire configuration, fixing what can be fixed.
    /// Returns the fixes applied and the warnings raised.
    pub fn validate(&self, config: &mut ValidatedConfig) -> Result<Vec<String>> {
        let mut warnings = Vec::new();
        let mut fixed_issues = Vec::new();

        info!("Validating configuration...");

        if !config.network.is_development() {
            return Err(anyhow!(
                "Configuration validation failed: {}",
                ConfigValidationError::UnsupportedNetwork(config.network)
            ));
        }

        if let Err(e) = self.validate_poll_interval("keeper_poll_interval", config.keeper_poll_interval_ms) {
            if self.can_fix() {
                config.keeper_poll_interval_ms = defaults::KEEPER_POLL_INTERVAL_MS;
                fixed_issues.push(format!("{}, reset to {} ms", e, config.keeper_poll_interval_ms));
            } else {
                return Err(anyhow!("Configuration validation failed: {}", e));
            }
        }

        if let Err(e) = self.validate_poll_interval("oracle_poll_interval", config.oracle_poll_interval_ms) {
            if self.can_fix() {
                config.oracle_poll_interval_ms = defaults::ORACLE_POLL_INTERVAL_MS;
                fixed_issues.push(format!("{}, reset to {} ms", e, config.oracle_poll_interval_ms));
            } else {
                return Err(anyhow!("Configuration validation failed: {}", e));
            }
        }

        if let Err(e) = self.validate_poll_interval(
            "simulated_entry_interval",
            config.simulated_entry_interval_ms,
        ) {
            if self.can_fix() {
                config.simulated_entry_interval_ms = defaults::SIMULATED_ENTRY_INTERVAL_MS;
                fixed_issues.push(format!(
                    "{}, reset to {} ms",
                    e, config.simulated_entry_interval_ms
                ));
            } else {
                return Err(anyhow!("Configuration validation failed: {}", e));
            }
        }

        if config.save_interval_secs == 0 {
            let e = ConfigValidationError::InvalidSaveInterval;
            if self.can_fix() {
                config.save_interval_secs = defaults::SAVE_INTERVAL_SECS;
                fixed_issues.push(format!("{}, reset to {} s", e, config.save_interval_secs));
            } else {
                return Err(anyhow!("Configuration validation failed: {}", e));
            }
        }

        if let Some(gas_limit) = config.callback_gas_limit {
            if let Err(e) = self.validate_callback_gas_limit(gas_limit) {
                if self.can_fix() {
                    config.callback_gas_limit = None;
                    fixed_issues.push(format!("{}, using the network preset", e));
                } else {
                    return Err(anyhow!("Configuration validation failed: {}", e));
                }
            }
        }

        if config.simulated_players > defaults::MAX_SIMULATED_PLAYERS {
            let e = ConfigValidationError::TooManySimulatedPlayers {
                value: config.simulated_players,
                max: defaults::MAX_SIMULATED_PLAYERS,
            };
            if self.can_fix() {
                config.simulated_players = defaults::MAX_SIMULATED_PLAYERS;
                fixed_issues.push(format!("{}, capped", e));
            } else {
                return Err(anyhow!("Configuration validation failed: {}", e));
            }
        }

        match self.validate_subscription_fund(config) {
            Ok(covered) if config.subscription_top_up_amount == 0 => {
                warnings.push(format!(
                    "Subscription fund covers only {} fulfillments and top-up is disabled",
                    covered
                ));
            }
            Ok(_) => {}
            Err(e) => {
                if self.strict_mode {
                    return Err(anyhow!("Configuration validation failed: {}", e));
                }
                warnings.push(e.to_string());
            }
        }

        if config.interval == Some(0) {
            warnings.push("Round interval is zero, upkeep runs as soon as a player enters".to_string());
        }

        if let Some(fee) = config.entrance_fee {
            if fee == 0 {
                warnings.push("Entrance fee is zero, free entries do not fund the pot".to_string());
            } else if config.simulated_players > 0 && fee > config.simulated_player_funds {
                warnings.push(format!(
                    "Simulated players hold {} but the entrance fee is {}",
                    format_coin(config.simulated_player_funds),
                    format_coin(fee)
                ));
            }
        }

        self.validate_and_create_paths(config)?;

        for fix in &fixed_issues {
            if log::log_enabled!(log::Level::Info) {
                info!("Auto-fixed: {}", fix);
            }
        }
        for warning in &warnings {
            if log::log_enabled!(log::Level::Warn) {
                warn!("Configuration warning: {}", warning);
            }
        }

        let mut all_messages = fixed_issues;
        all_messages.extend(warnings);
        Ok(all_messages)
    }

    fn validate_poll_interval(&self, field: &'static str, value: u64) -> ValidationResult<()> {
        if !(defaults::MIN_POLL_INTERVAL_MS..=defaults::MAX_POLL_INTERVAL_MS).contains(&value) {
            return Err(ConfigValidationError::InvalidPollInterval {
                field,
                value,
                min: defaults::MIN_POLL_INTERVAL_MS,
                max: defaults::MAX_POLL_INTERVAL_MS,
            });
        }
        Ok(())
    }

    fn validate_callback_gas_limit(&self, value: u32) -> ValidationResult<()> {
        if value == 0 || value > defaults::MAX_CALLBACK_GAS_LIMIT {
            return Err(ConfigValidationError::InvalidCallbackGasLimit {
                value,
                max: defaults::MAX_CALLBACK_GAS_LIMIT,
            });
        }
        Ok(())
    }

    // Returns how many fulfillments the initial fund pays for
    fn validate_subscription_fund(&self, config: &ValidatedConfig) -> ValidationResult<u64> {
        let gas_limit = config
            .callback_gas_limit
            .unwrap_or(config.network.preset().callback_gas_limit);
        let payment = config
            .gas_price_link
            .saturating_mul(gas_limit as u64)
            .saturating_add(config.base_fee);
        if config.subscription_fund_amount < payment {
            return Err(ConfigValidationError::UnderfundedSubscription {
                fund: config.subscription_fund_amount,
                payment,
            });
        }
        Ok(config.subscription_fund_amount / payment.max(1))
    }

    fn validate_and_create_paths(&self, config: &ValidatedConfig) -> Result<()> {
        if !config.disable_file_logging {
            self.ensure_directory_exists("logs_path", &config.logs_path)?;
        }
        if !config.disable_storage {
            self.ensure_directory_exists("storage_path", &config.storage_path)?;
        }
        Ok(())
    }

    fn ensure_directory_exists(&self, field: &'static str, path: &str) -> Result<()> {
        let path_buf = PathBuf::from(path);
        if path_buf.exists() {
            if !path_buf.is_dir() {
                return Err(anyhow!(ConfigValidationError::InvalidPath {
                    field,
                    path: path.to_string(),
                    reason: "exists and is not a directory".to_string(),
                }));
            }
            return Ok(());
        }

        std::fs::create_dir_all(&path_buf).map_err(|e| {
            anyhow!(ConfigValidationError::InvalidPath {
                field,
                path: path.to_string(),
                reason: e.to_string(),
            })
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lottery_common::config::COIN_VALUE;
    use tempdir::TempDir;

    use super::*;

    // Default configuration writing under a temporary directory
    fn config(dir: &TempDir) -> ValidatedConfig {
        ValidatedConfig {
            logs_path: dir.path().join("logs").display().to_string(),
            storage_path: dir.path().join("storage").display().to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let dir = TempDir::new("lottery-config").unwrap();
        let mut config = config(&dir);
        let messages = ConfigValidator::new(false, true)
            .validate(&mut config)
            .unwrap();
        assert!(messages.is_empty());
        assert!(dir.path().join("logs").is_dir());
        assert!(dir.path().join("storage").is_dir());
    }

    #[test]
    fn test_auto_fix_poll_interval() {
        let dir = TempDir::new("lottery-config").unwrap();
        let mut config = config(&dir);
        config.keeper_poll_interval_ms = 0;
        config.callback_gas_limit = Some(0);

        let messages = ConfigValidator::new(false, true)
            .validate(&mut config)
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(config.keeper_poll_interval_ms, defaults::KEEPER_POLL_INTERVAL_MS);
        assert_eq!(config.callback_gas_limit, None);
    }

    #[test]
    fn test_strict_mode_rejects() {
        let dir = TempDir::new("lottery-config").unwrap();
        let mut config = config(&dir);
        config.oracle_poll_interval_ms = 1;
        assert!(ConfigValidator::new(true, true).validate(&mut config).is_err());
    }

    #[test]
    fn test_testnet_is_rejected() {
        let dir = TempDir::new("lottery-config").unwrap();
        let mut config = config(&dir);
        config.network = Network::Testnet;
        assert!(ConfigValidator::new(false, true).validate(&mut config).is_err());
    }

    #[test]
    fn test_underfunded_subscription_warns() {
        let dir = TempDir::new("lottery-config").unwrap();
        let mut config = config(&dir);
        config.subscription_fund_amount = 1;
        let messages = ConfigValidator::new(false, true)
            .validate(&mut config)
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert!(ConfigValidator::new(true, false)
            .validate(&mut config)
            .is_err());
    }

    #[test]
    fn test_disabled_top_up_warns_rounds_covered() {
        let dir = TempDir::new("lottery-config").unwrap();
        let mut config = config(&dir);
        config.subscription_top_up_amount = 0;
        let messages = ConfigValidator::new(false, true)
            .validate(&mut config)
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("covers only 19 fulfillments"));
    }

    #[test]
    fn test_fulfillment_delay_follows_network() {
        let mut config = ValidatedConfig::default();
        assert_eq!(
            config.fulfillment_delay(),
            Network::Devnet.preset().block_confirmations
        );
        config.fulfillment_delay_secs = Some(0);
        assert_eq!(config.fulfillment_delay(), 0);
    }

    #[test]
    fn test_deployment_settings() {
        let config = ValidatedConfig {
            entrance_fee: Some(42),
            deployer: Some(Address::derive(b"me")),
            ..Default::default()
        };
        let settings = config.to_deployment_settings();
        assert_eq!(settings.entrance_fee, Some(42));
        assert_eq!(settings.deployer, Address::derive(b"me"));
        assert_eq!(settings.network, Network::Devnet);
    }

    #[test]
    fn test_template_roundtrip() {
        let dir = TempDir::new("lottery-config").unwrap();
        let path = dir.path().join("config.json");
        ValidatedConfig::generate_template(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: ValidatedConfig = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded, ValidatedConfig::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new("lottery-config").unwrap();
        let path = dir.path().join("config.json");
        let logs = dir.path().join("logs").display().to_string();
        let storage = dir.path().join("storage").display().to_string();
        std::fs::write(
            &path,
            serde_json::json!({
                "network": "devnet",
                "entrance_fee": 5,
                "logs_path": logs,
                "storage_path": storage,
            })
            .to_string(),
        )
        .unwrap();

        let loaded = ValidatedConfig::from_file(&path, false, true).unwrap();
        assert_eq!(loaded.entrance_fee, Some(5));
        assert_eq!(loaded.keeper_poll_interval_ms, defaults::KEEPER_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = CliConfig::parse_from([
            "lottery_daemon",
            "--simulated-players",
            "4",
            "--interval",
            "60",
            "--log-level",
            "debug",
            "--entrance-fee",
            "0.1",
        ]);
        let config = cli.to_validated_config();
        assert_eq!(config.simulated_players, 4);
        assert_eq!(config.interval, Some(60));
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.entrance_fee, Some(COIN_VALUE / 10));
        assert!(config.auto_fix_config);
    }

    #[test]
    fn test_cli_rejects_bad_entrance_fee() {
        let result =
            CliConfig::try_parse_from(["lottery_daemon", "--entrance-fee", "0.0000000001"]);
        assert!(result.is_err());
    }
}

//! Client configuration
//!
//! Assembled from three sources, later ones winning:
//! 1. built-in defaults
//! 2. a TOML file (`orderbook.toml` unless `--config` says otherwise)
//! 3. environment variables, with `.env` loaded first

use alloy_primitives::Address;
use alloy_sol_types::SolEvent;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::contracts::bindings::{OrderExecuted, OrderSubmitted};
use crate::events::EventSignatures;
use crate::ledger::RpcOptions;
use crate::sync::{SyncOptions, DEFAULT_CONCURRENCY, DEFAULT_GAS};

pub const DEFAULT_CONFIG_PATH: &str = "orderbook.toml";

pub const ENV_RPC_URL: &str = "ORDERBOOK_RPC_URL";
pub const ENV_TOKEN_ADDRESS: &str = "ORDERBOOK_TOKEN_ADDRESS";
pub const ENV_EXCHANGE_ADDRESS: &str = "ORDERBOOK_EXCHANGE_ADDRESS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Explicit token address; otherwise read from `token_artifact`.
    #[serde(default)]
    pub token_address: Option<Address>,
    #[serde(default)]
    pub exchange_address: Option<Address>,
    #[serde(default = "default_token_artifact")]
    pub token_artifact: String,
    #[serde(default = "default_exchange_artifact")]
    pub exchange_artifact: String,
    #[serde(default = "default_gas")]
    pub gas: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,
    #[serde(default = "default_submitted_event")]
    pub submitted_event: String,
    #[serde(default = "default_executed_event")]
    pub executed_event: String,
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_token_artifact() -> String {
    "build/contracts/Token.json".to_string()
}

fn default_exchange_artifact() -> String {
    "build/contracts/Exchange.json".to_string()
}

fn default_gas() -> u64 {
    DEFAULT_GAS
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_receipt_poll_ms() -> u64 {
    500
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_read_retries() -> u32 {
    3
}

fn default_submitted_event() -> String {
    OrderSubmitted::SIGNATURE.to_string()
}

fn default_executed_event() -> String {
    OrderExecuted::SIGNATURE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            token_address: None,
            exchange_address: None,
            token_artifact: default_token_artifact(),
            exchange_artifact: default_exchange_artifact(),
            gas: default_gas(),
            poll_interval_ms: default_poll_interval_ms(),
            receipt_poll_ms: default_receipt_poll_ms(),
            http_timeout_secs: default_http_timeout_secs(),
            concurrency: default_concurrency(),
            read_retries: default_read_retries(),
            submitted_event: default_submitted_event(),
            executed_event: default_executed_event(),
        }
    }
}

impl Config {
    /// Load `.env`, then the TOML file at `path`, then environment overrides.
    ///
    /// A missing file at the default path is not an error; an explicitly
    /// given one must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.rpc_url = url;
        }
        if let Some(raw) = lookup(ENV_TOKEN_ADDRESS) {
            let address = raw
                .parse()
                .with_context(|| format!("{} must be a hex address", ENV_TOKEN_ADDRESS))?;
            self.token_address = Some(address);
        }
        if let Some(raw) = lookup(ENV_EXCHANGE_ADDRESS) {
            let address = raw
                .parse()
                .with_context(|| format!("{} must be a hex address", ENV_EXCHANGE_ADDRESS))?;
            self.exchange_address = Some(address);
        }
        Ok(())
    }

    pub fn event_signatures(&self) -> EventSignatures {
        EventSignatures {
            submitted: self.submitted_event.clone(),
            executed: self.executed_event.clone(),
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            gas: self.gas,
            concurrency: self.concurrency.max(1),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            events: self.event_signatures(),
        }
    }

    pub fn rpc_options(&self) -> RpcOptions {
        RpcOptions {
            timeout: Duration::from_secs(self.http_timeout_secs),
            receipt_poll: Duration::from_millis(self.receipt_poll_ms),
            read_retries: self.read_retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sync_options().events, EventSignatures::default());
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            rpc_url = "http://ledger:7545"
            exchange_address = "0x00000000000000000000000000000000000000ee"
            concurrency = 0
            executed_event = "LogOrderExecuted(bytes32,address,address,address,uint256,address,uint256)"
            "#,
        )
        .unwrap();
        assert_eq!(config.rpc_url, "http://ledger:7545");
        assert_eq!(config.exchange_address, Some(Address::with_last_byte(0xee)));
        assert_eq!(config.token_address, None);
        assert_eq!(config.gas, DEFAULT_GAS);
        // Zero concurrency would stall bootstrap.
        assert_eq!(config.sync_options().concurrency, 1);
        assert!(config.event_signatures().executed.starts_with("LogOrderExecuted("));
        assert_eq!(config.event_signatures().submitted, OrderSubmitted::SIGNATURE);
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            (ENV_RPC_URL, "http://override:8545"),
            (ENV_TOKEN_ADDRESS, "0x0000000000000000000000000000000000000070"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.rpc_url, "http://override:8545");
        assert_eq!(config.token_address, Some(Address::with_last_byte(0x70)));
        assert_eq!(config.exchange_address, None);
    }

    #[test]
    fn test_bad_env_address_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == ENV_EXCHANGE_ADDRESS).then(|| "not-an-address".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_rpc_options() {
        let config: Config = toml::from_str("http_timeout_secs = 5\nread_retries = 0").unwrap();
        let options = config.rpc_options();
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.read_retries, 0);
        assert_eq!(options.receipt_poll, Duration::from_millis(500));
    }
}

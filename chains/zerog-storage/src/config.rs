use anyhow::{Context, Result};
use config::{Config, File};
use core_logic::config::{ChainConfig, WalletSource};
use core_logic::{ConfigError, RetryConfig};
use ethers::types::{Address, U256};
use serde::Deserialize;
use std::time::Duration;

/// Runtime settings for the 0G storage uploader. Every field has a built-in
/// default; a TOML file only needs to list what it overrides.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: String,
    pub indexer_url: String,
    pub explorer_url: String,
    pub image_sources: Vec<String>,
    pub gas_limit: u64,
    pub upload_value_wei: u64,
    pub min_balance_wei: u64,
    pub confirmation_timeout_secs: u64,
    pub receipt_poll_interval_ms: u64,
    pub max_upload_attempts: u32,
    pub max_addressing_attempts: u32,
    pub backoff_min_secs: u64,
    pub backoff_max_secs: u64,
    pub upload_delay_secs: u64,
    pub wallet_delay_secs: u64,
    pub failure_delay_secs: u64,
    /// Include the RPC gas price in the pre-send balance check
    pub strict_affordability: bool,
    pub key_file: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://evmrpc-testnet.0g.ai".to_string(),
            chain_id: 16601,
            contract_address: "0xbD75117F80b4E22698D0Cd7612d92BDb8eaff628".to_string(),
            indexer_url: "https://indexer-storage-testnet-turbo.0g.ai".to_string(),
            explorer_url: "https://chainscan-galileo.0g.ai/tx/".to_string(),
            image_sources: vec![
                "https://picsum.photos/800/600".to_string(),
                "https://loremflickr.com/800/600".to_string(),
            ],
            gas_limit: 500_000,
            upload_value_wei: 839_233_398_436_224, // 0.000839233398436224 OG
            min_balance_wei: 1_500_000_000_000_000, // 0.0015 OG
            confirmation_timeout_secs: 10,
            receipt_poll_interval_ms: 1000,
            max_upload_attempts: 3,
            max_addressing_attempts: 5,
            backoff_min_secs: 10,
            backoff_max_secs: 30,
            upload_delay_secs: 3,
            wallet_delay_secs: 10,
            failure_delay_secs: 5,
            strict_affordability: false,
            key_file: None,
        }
    }
}

impl StorageConfig {
    pub const DEFAULT_PATH: &'static str = "chains/zerog-storage/config.toml";

    /// Loads `path` on top of the defaults. A missing file is not an error.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        let config: Self = settings.try_deserialize().map_err(|e| anyhow::anyhow!(e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.chain_id == 0 {
            return Err(invalid("chain_id", "must be non-zero"));
        }
        for (field, url) in [
            ("rpc_url", &self.rpc_url),
            ("indexer_url", &self.indexer_url),
        ] {
            reqwest::Url::parse(url).map_err(|e| invalid(field, &e.to_string()))?;
        }
        if self.image_sources.is_empty() {
            return Err(invalid("image_sources", "at least one source is required"));
        }
        self.contract()
            .map_err(|e| invalid("contract_address", &e.to_string()))?;
        if self.receipt_poll_interval_ms == 0 {
            return Err(invalid("receipt_poll_interval_ms", "must be non-zero"));
        }
        if self.max_upload_attempts == 0 {
            return Err(invalid("max_upload_attempts", "must be at least 1"));
        }
        if self.max_addressing_attempts == 0 {
            return Err(invalid("max_addressing_attempts", "must be at least 1"));
        }
        if self.backoff_min_secs > self.backoff_max_secs {
            return Err(invalid(
                "backoff_min_secs",
                "must not exceed backoff_max_secs",
            ));
        }
        Ok(())
    }

    pub fn contract(&self) -> Result<Address> {
        self.contract_address
            .parse::<Address>()
            .with_context(|| format!("Invalid contract address {}", self.contract_address))
    }

    pub fn gas_limit(&self) -> U256 {
        U256::from(self.gas_limit)
    }

    pub fn upload_value(&self) -> U256 {
        U256::from(self.upload_value_wei)
    }

    pub fn min_balance(&self) -> U256 {
        U256::from(self.min_balance_wei)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            self.max_upload_attempts,
            self.backoff_min_secs * 1000,
            self.backoff_max_secs * 1000,
        )
    }

    pub fn wallet_source(&self) -> WalletSource {
        WalletSource::from_key_file(self.key_file.as_deref())
    }

    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            name: "0G Galileo Testnet".to_string(),
            rpc_endpoint: self.rpc_url.clone(),
            chain_id: self.chain_id,
        }
    }
}

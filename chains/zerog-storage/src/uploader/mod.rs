//! Upload orchestration: one content descriptor, one wallet, bounded retries.
//!
//! Each attempt pushes the payload to the indexer as a single segment, then
//! registers it on-chain with a fixed-gas transaction and waits for the
//! receipt. The balance is read once up front; an underfunded wallet is never
//! retried.

use crate::chain::{block_label, ChainClient, UploadTx};
use crate::config::StorageConfig;
use crate::content::ContentDescriptor;
use crate::error::UploadError;
use crate::indexer::{SegmentRequest, StorageIndexer};
use core_logic::{with_retry, RetryConfig, Sleeper};
use ethers::prelude::*;
use ethers::utils::format_ether;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Function selector of the flow contract's `submit` entry point.
pub const UPLOAD_SELECTOR: [u8; 4] = [0xef, 0x3e, 0x12, 0xdc];

/// Selector plus eight 32-byte words.
pub const UPLOAD_CALLDATA_LEN: usize = 4 + 8 * 32;

fn word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Submission calldata carrying a single content hash.
pub fn build_upload_calldata(content_hash: [u8; 32]) -> Bytes {
    let mut data = Vec::with_capacity(UPLOAD_CALLDATA_LEN);
    data.extend_from_slice(&UPLOAD_SELECTOR);
    for value in [0x20, 0x14, 0x60, 0x80, 0x00, 0x01] {
        data.extend_from_slice(&word(value));
    }
    data.extend_from_slice(&content_hash);
    data.extend_from_slice(&word(0));
    Bytes::from(data)
}

/// Furthest point one attempt reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    SegmentPending,
    SegmentUploaded,
    TxSubmitted,
    TxConfirmed,
    TxFailed,
    TxTimeout,
}

impl UploadStage {
    /// Stage to report for an attempt that stopped here with `error`.
    pub fn on_failure(self, error: &UploadError) -> Self {
        match error {
            UploadError::Timeout { .. } => UploadStage::TxTimeout,
            UploadError::TransactionReverted { .. } => UploadStage::TxFailed,
            _ => self,
        }
    }
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStage::SegmentPending => "segment-pending",
            UploadStage::SegmentUploaded => "segment-uploaded",
            UploadStage::TxSubmitted => "tx-submitted",
            UploadStage::TxConfirmed => "tx-confirmed",
            UploadStage::TxFailed => "tx-failed",
            UploadStage::TxTimeout => "tx-timeout",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub contract: Address,
    pub chain_id: u64,
    pub gas_limit: U256,
    pub value: U256,
    pub min_balance: U256,
    pub confirmation_timeout: Duration,
    pub retry: RetryConfig,
    pub explorer_url: String,
    pub strict_affordability: bool,
}

impl UploadSettings {
    pub fn from_config(config: &StorageConfig) -> anyhow::Result<Self> {
        Ok(Self {
            contract: config.contract()?,
            chain_id: config.chain_id,
            gas_limit: config.gas_limit(),
            value: config.upload_value(),
            min_balance: config.min_balance(),
            confirmation_timeout: config.confirmation_timeout(),
            retry: config.retry_config(),
            explorer_url: config.explorer_url.clone(),
            strict_affordability: config.strict_affordability,
        })
    }

    pub fn explorer_link(&self, tx_hash: TxHash) -> String {
        format!("{}{:?}", self.explorer_url, tx_hash)
    }
}

pub struct UploadOrchestrator {
    chain: Arc<dyn ChainClient>,
    indexer: Arc<dyn StorageIndexer>,
    sleeper: Arc<dyn Sleeper>,
    settings: UploadSettings,
}

impl UploadOrchestrator {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        indexer: Arc<dyn StorageIndexer>,
        sleeper: Arc<dyn Sleeper>,
        settings: UploadSettings,
    ) -> Self {
        Self {
            chain,
            indexer,
            sleeper,
            settings,
        }
    }

    /// Uploads `content` from `wallet`, retrying failed attempts with a
    /// randomized backoff. Returns the confirmed receipt or the last error.
    pub async fn upload(
        &self,
        wallet: &LocalWallet,
        wallet_index: usize,
        content: &ContentDescriptor,
    ) -> Result<TransactionReceipt, UploadError> {
        let address = wallet.address();

        info!("Checking wallet balance for {:?}...", address);
        let balance = self
            .chain
            .balance_of(address)
            .await
            .map_err(|e| UploadError::Chain {
                reason: format!("{:#}", e),
            })?;

        if balance < self.settings.min_balance {
            return Err(UploadError::InsufficientBalance {
                balance: format_ether(balance),
                required: format_ether(self.settings.min_balance),
            });
        }
        info!("Wallet balance: {} OG", format_ether(balance));

        with_retry(
            &self.settings.retry,
            "Upload",
            self.sleeper.as_ref(),
            UploadError::is_retryable,
            move |attempt| self.attempt(wallet, wallet_index, content, balance, attempt),
        )
        .await
    }

    async fn attempt(
        &self,
        wallet: &LocalWallet,
        wallet_index: usize,
        content: &ContentDescriptor,
        balance: U256,
        attempt: u32,
    ) -> Result<TransactionReceipt, UploadError> {
        info!(
            "Uploading file for wallet #{} [{:?}] (Attempt {}/{})...",
            wallet_index + 1,
            wallet.address(),
            attempt,
            self.settings.retry.max_attempts
        );

        let mut stage = UploadStage::SegmentPending;
        let result = self.run_stages(wallet, content, balance, &mut stage).await;
        if let Err(e) = &result {
            warn!("Attempt {} stopped at {}", attempt, stage.on_failure(e));
        }
        result
    }

    async fn run_stages(
        &self,
        wallet: &LocalWallet,
        content: &ContentDescriptor,
        balance: U256,
        stage: &mut UploadStage,
    ) -> Result<TransactionReceipt, UploadError> {
        self.indexer
            .upload_segment(&SegmentRequest::single(content))
            .await
            .map_err(|e| UploadError::SegmentUpload {
                reason: format!("{:#}", e),
            })?;
        *stage = UploadStage::SegmentUploaded;
        info!("File segment uploaded");

        let content_hash: [u8; 32] = rand::random();
        let data = build_upload_calldata(content_hash);

        info!("Using fixed gas limit: {}", self.settings.gas_limit);
        self.check_affordability(balance).await?;

        info!("Sending transaction...");
        let submission = |e: anyhow::Error| UploadError::Submission {
            reason: format!("{:#}", e),
        };
        let nonce = self
            .chain
            .next_nonce(wallet.address())
            .await
            .map_err(submission)?;

        let tx = UploadTx {
            to: self.settings.contract,
            data,
            value: self.settings.value,
            nonce,
            gas_limit: self.settings.gas_limit,
            chain_id: self.settings.chain_id,
        };
        let tx_hash = self.chain.submit(wallet, tx).await.map_err(submission)?;
        *stage = UploadStage::TxSubmitted;

        let link = self.settings.explorer_link(tx_hash);
        info!("Transaction sent: {:?}", tx_hash);
        info!("Explorer: {}", link);

        let timeout = self.settings.confirmation_timeout;
        info!("Waiting for confirmation ({}s)...", timeout.as_secs());
        let receipt = self
            .chain
            .await_confirmation(tx_hash, timeout, &link)
            .await?;
        *stage = UploadStage::TxConfirmed;

        info!("Transaction confirmed in block {}", block_label(&receipt));
        info!("File uploaded, root hash: {}", content.root);
        Ok(receipt)
    }

    /// `balance >= gasLimit + value`, or `gasLimit * gasPrice + value` when
    /// strict affordability is on.
    async fn check_affordability(&self, balance: U256) -> Result<(), UploadError> {
        let gas_cost = if self.settings.strict_affordability {
            let price = self
                .chain
                .gas_price()
                .await
                .map_err(|e| UploadError::Chain {
                    reason: format!("{:#}", e),
                })?;
            self.settings.gas_limit.saturating_mul(price)
        } else {
            self.settings.gas_limit
        };

        let required = gas_cost.saturating_add(self.settings.value);
        if balance < required {
            return Err(UploadError::InsufficientBalance {
                balance: format_ether(balance),
                required: format_ether(required),
            });
        }
        Ok(())
    }
}

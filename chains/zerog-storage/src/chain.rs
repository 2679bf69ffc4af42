//! JSON-RPC access to the 0G EVM chain: network checks, account queries,
//! signed submission and receipt tracking.

use crate::error::UploadError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{Credential, NetworkError};
use ethers::prelude::*;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fields of one upload transaction. Gas price is left to the RPC.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTx {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub nonce: U256,
    pub gas_limit: U256,
    pub chain_id: u64,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    fn endpoint(&self) -> &str;

    async fn chain_id(&self) -> Result<u64>;

    async fn block_number(&self) -> Result<u64>;

    async fn balance_of(&self, address: Address) -> Result<U256>;

    /// Transaction count at the latest block.
    async fn next_nonce(&self, address: Address) -> Result<U256>;

    async fn gas_price(&self) -> Result<U256>;

    /// Signs with `wallet` and broadcasts. Returns as soon as the node has
    /// accepted the transaction.
    async fn submit(&self, wallet: &LocalWallet, tx: UploadTx) -> Result<TxHash>;

    /// `None` while the transaction is unknown to the node or not yet mined.
    async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<TransactionReceipt>>;

    /// Pause between receipt lookups while waiting for confirmation.
    fn poll_interval(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn verify_network(&self, expected: u64) -> Result<(), NetworkError> {
        let actual = self
            .chain_id()
            .await
            .map_err(|e| NetworkError::ConnectionRefused {
                endpoint: self.endpoint().to_string(),
                reason: format!("{:#}", e),
            })?;

        if actual != expected {
            return Err(NetworkError::ChainIdMismatch { expected, actual });
        }
        Ok(())
    }

    /// Current block height, or `NotSynced` when the node cannot report one.
    async fn ensure_synced(&self) -> Result<u64, NetworkError> {
        match self.block_number().await {
            Ok(block) => Ok(block),
            Err(e) => {
                warn!("Network sync check failed: {:#}", e);
                Err(NetworkError::NotSynced {
                    endpoint: self.endpoint().to_string(),
                })
            }
        }
    }

    /// Polls for the receipt until `wait` has elapsed, then looks it up once
    /// more in case it landed just after the deadline. A node that has not
    /// seen the transaction yet keeps the wait going.
    async fn await_confirmation(
        &self,
        tx_hash: TxHash,
        wait: Duration,
        link: &str,
    ) -> Result<TransactionReceipt, UploadError> {
        let watch = async {
            loop {
                match self.get_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => debug!("Receipt poll failed: {:#}", e),
                }
                tokio::time::sleep(self.poll_interval()).await;
            }
        };

        let receipt = match tokio::time::timeout(wait, watch).await {
            Ok(receipt) => receipt,
            Err(_) => {
                warn!("Transaction timeout after {}s.", wait.as_secs());
                let late = self.get_receipt(tx_hash).await.unwrap_or_else(|e| {
                    warn!("Receipt lookup failed: {:#}", e);
                    None
                });
                match late {
                    Some(receipt) => {
                        if receipt_succeeded(&receipt) {
                            info!(
                                "Transaction confirmed late in block {}",
                                block_label(&receipt)
                            );
                        }
                        receipt
                    }
                    None => {
                        return Err(UploadError::Timeout {
                            waited_secs: wait.as_secs(),
                            link: link.to_string(),
                        })
                    }
                }
            }
        };

        if !receipt_succeeded(&receipt) {
            return Err(UploadError::TransactionReverted {
                link: link.to_string(),
                status: receipt
                    .status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            });
        }
        Ok(receipt)
    }
}

pub fn receipt_succeeded(receipt: &TransactionReceipt) -> bool {
    receipt.status == Some(U64::from(1))
}

pub fn block_label(receipt: &TransactionReceipt) -> String {
    receipt
        .block_number
        .map(|b| b.to_string())
        .unwrap_or_else(|| "pending".to_string())
}

/// Signing wallet for a validated credential, bound to `chain_id`.
pub fn credential_to_wallet(credential: &Credential, chain_id: u64) -> Result<LocalWallet, UploadError> {
    LocalWallet::from_bytes(credential.as_bytes())
        .map(|wallet| wallet.with_chain_id(chain_id))
        .map_err(|e| UploadError::Wallet {
            reason: format!("{} ({})", e, credential.label()),
        })
}

pub struct EvmChainClient {
    provider: Provider<Http>,
    endpoint: String,
    poll_interval: Duration,
}

impl EvmChainClient {
    pub fn new(rpc_url: &str, client: reqwest::Client) -> Result<Self> {
        let url = reqwest::Url::parse(rpc_url)
            .with_context(|| format!("Invalid RPC URL {}", rpc_url))?;
        let provider = Provider::new(Http::new_with_client(url, client));

        Ok(Self {
            provider,
            endpoint: rpc_url.to_string(),
            poll_interval: Duration::from_millis(1000),
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn chain_id(&self) -> Result<u64> {
        let id = self
            .provider
            .get_chainid()
            .await
            .context("Failed to get chain id")?;
        Ok(id.as_u64())
    }

    async fn block_number(&self) -> Result<u64> {
        let block = self
            .provider
            .get_block_number()
            .await
            .context("Failed to get block number")?;
        Ok(block.as_u64())
    }

    async fn balance_of(&self, address: Address) -> Result<U256> {
        self.provider
            .get_balance(address, None)
            .await
            .with_context(|| format!("Failed to get balance of {:?}", address))
    }

    async fn next_nonce(&self, address: Address) -> Result<U256> {
        self.provider
            .get_transaction_count(address, Some(BlockNumber::Latest.into()))
            .await
            .with_context(|| format!("Failed to get nonce of {:?}", address))
    }

    async fn gas_price(&self) -> Result<U256> {
        self.provider
            .get_gas_price()
            .await
            .context("Failed to get gas price")
    }

    async fn submit(&self, wallet: &LocalWallet, tx: UploadTx) -> Result<TxHash> {
        let client = SignerMiddleware::new(
            self.provider.clone(),
            wallet.clone().with_chain_id(tx.chain_id),
        );

        let request = TransactionRequest::new()
            .to(tx.to)
            .data(tx.data)
            .value(tx.value)
            .nonce(tx.nonce)
            .gas(tx.gas_limit)
            .chain_id(tx.chain_id);

        let pending = client
            .send_transaction(request, None)
            .await
            .context("Failed to send transaction")?;

        Ok(pending.tx_hash())
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<TransactionReceipt>> {
        self.provider
            .get_transaction_receipt(tx_hash)
            .await
            .context("Failed to get transaction receipt")
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

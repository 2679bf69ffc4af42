use crate::chain::credential_to_wallet;
use crate::config::StorageConfig;
use crate::content::{ContentAddresser, ContentSource};
use crate::error::UploadError;
use crate::uploader::UploadOrchestrator;
use core_logic::{InputError, KeyCursor, KeyStore, RunResult, Sleeper};
use ethers::signers::{LocalWallet, Signer};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Fixed pauses between units and wallets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDelays {
    pub between_uploads: Duration,
    pub between_wallets: Duration,
    pub after_failure: Duration,
}

impl Default for RunDelays {
    fn default() -> Self {
        Self {
            between_uploads: Duration::from_secs(3),
            between_wallets: Duration::from_secs(10),
            after_failure: Duration::from_secs(5),
        }
    }
}

impl RunDelays {
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            between_uploads: Duration::from_secs(config.upload_delay_secs),
            between_wallets: Duration::from_secs(config.wallet_delay_secs),
            after_failure: Duration::from_secs(config.failure_delay_secs),
        }
    }
}

/// Parses the operator's uploads-per-wallet answer. Must be a positive integer.
pub fn parse_upload_count(input: &str) -> Result<u32, InputError> {
    let invalid = || InputError::InvalidCount {
        input: input.to_string(),
    };
    match input.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(count) => Ok(count),
    }
}

/// Walks every credential in order and runs `count` upload units on each.
/// A failed unit is counted and the run moves on.
pub struct RunScheduler {
    source: Arc<dyn ContentSource>,
    addresser: ContentAddresser,
    orchestrator: UploadOrchestrator,
    sleeper: Arc<dyn Sleeper>,
    delays: RunDelays,
    chain_id: u64,
}

impl RunScheduler {
    pub fn new(
        source: Arc<dyn ContentSource>,
        addresser: ContentAddresser,
        orchestrator: UploadOrchestrator,
        sleeper: Arc<dyn Sleeper>,
        chain_id: u64,
    ) -> Self {
        Self {
            source,
            addresser,
            orchestrator,
            sleeper,
            delays: RunDelays::default(),
            chain_id,
        }
    }

    pub fn with_delays(mut self, delays: RunDelays) -> Self {
        self.delays = delays;
        self
    }

    pub async fn run(&self, store: &KeyStore, count: u32, token: &CancellationToken) -> RunResult {
        let mut result = RunResult::new(store.len(), count);
        let total_uploads = result.planned();
        let mut cursor = KeyCursor::new();

        info!(
            "Starting {} uploads ({} per wallet)",
            total_uploads, count
        );

        'wallets: for wallet_index in 0..store.len() {
            if token.is_cancelled() {
                break;
            }

            let wallet = match cursor
                .select(store, wallet_index)
                .and_then(|_| cursor.current(store))
            {
                Ok(credential) => credential_to_wallet(credential, self.chain_id),
                Err(e) => Err(UploadError::Wallet {
                    reason: e.to_string(),
                }),
            };

            match wallet {
                Ok(wallet) => {
                    info!(
                        "==== Processing Wallet #{} [{:?}] ====",
                        wallet_index + 1,
                        wallet.address()
                    );

                    for i in 1..=count {
                        if token.is_cancelled() {
                            break 'wallets;
                        }

                        let upload_number = wallet_index as u64 * count as u64 + i as u64;
                        info!(
                            "Upload {}/{} (Wallet #{}, File #{})",
                            upload_number,
                            total_uploads,
                            wallet_index + 1,
                            i
                        );

                        let pause = match self.run_unit(&wallet, wallet_index).await {
                            Ok(()) => {
                                result.record_success();
                                info!(
                                    target: "upload_result",
                                    "Upload {} completed: Success", upload_number
                                );
                                (i < count).then_some(self.delays.between_uploads)
                            }
                            Err(e) => {
                                result.record_failure();
                                error!(
                                    target: "upload_result",
                                    "Upload {} Failed: {}", upload_number, e
                                );
                                Some(self.delays.after_failure)
                            }
                        };

                        if let Some(pause) = pause {
                            if !self.pause(pause, token).await {
                                break 'wallets;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!(
                        "Wallet #{} skipped, {} uploads counted as failed: {}",
                        wallet_index + 1,
                        count,
                        e
                    );
                    for _ in 0..count {
                        result.record_failure();
                    }
                }
            }

            if wallet_index + 1 < store.len() {
                info!(
                    "Switching to next wallet in {} seconds...",
                    self.delays.between_wallets.as_secs()
                );
                if !self.pause(self.delays.between_wallets, token).await {
                    break;
                }
            }
        }

        if token.is_cancelled() {
            warn!("Run stopped early by operator");
        }
        result
    }

    /// One fetch, address and upload cycle.
    async fn run_unit(&self, wallet: &LocalWallet, wallet_index: usize) -> Result<(), UploadError> {
        let payload = self.source.fetch_random().await?;
        let content = self.addresser.address_content(&payload).await?;
        self.orchestrator
            .upload(wallet, wallet_index, &content)
            .await
            .map(|_| ())
    }

    /// Sleeps unless the run is cancelled first. Returns false on cancellation.
    async fn pause(&self, duration: Duration, token: &CancellationToken) -> bool {
        tokio::select! {
            _ = token.cancelled() => false,
            _ = self.sleeper.sleep(duration) => true,
        }
    }
}

pub fn log_summary(result: &RunResult) {
    info!("==== Upload Summary ====");
    info!("Total wallets processed: {}", result.wallets);
    info!("Uploads attempted per wallet: {}", result.per_wallet);
    info!("Total uploads attempted: {}", result.attempted);
    if result.succeeded > 0 {
        info!(target: "upload_result", "Success uploads: {}", result.succeeded);
    }
    if result.failed > 0 {
        error!(target: "upload_result", "Failed uploads: {}", result.failed);
    }
    info!("Success rate: {:.1}%", result.success_rate());
    info!("All operations completed.");
}

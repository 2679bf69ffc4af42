#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use core_logic::{KeyCandidate, KeyStore, Sleeper};
use ethers::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use zerog_storage::chain::{ChainClient, UploadTx};
use zerog_storage::config::StorageConfig;
use zerog_storage::content::{ContentDescriptor, ContentSource};
use zerog_storage::error::UploadError;
use zerog_storage::indexer::{SegmentRequest, StorageIndexer};
use zerog_storage::uploader::{UploadOrchestrator, UploadSettings};

pub const TEST_CHAIN_ID: u64 = 16601;

/// Confirmation deadline used by `test_settings`.
pub const TEST_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(10);

/// How a submitted transaction shows up in receipt lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Receipt available on the first lookup.
    Mined(u64),
    /// Unknown to the node until `after` has passed since submission.
    Indexed { after: Duration, status: u64 },
    /// Receipt appears only once the confirmation deadline has passed.
    Late(u64),
    /// Never mined.
    Dropped,
}

struct Submitted {
    confirmation: Confirmation,
    at: Instant,
}

pub struct MockChain {
    pub chain_id: u64,
    pub block: Option<u64>,
    pub balance: U256,
    pub gas_price: U256,
    pub nonce: U256,
    poll_interval: Duration,
    plan: Mutex<VecDeque<Confirmation>>,
    fallback: Confirmation,
    outcomes: Mutex<HashMap<TxHash, Submitted>>,
    submit_failures: AtomicU32,
    pub submits: AtomicU32,
    pub balance_queries: AtomicU32,
    pub gas_price_queries: AtomicU32,
    pub receipt_queries: AtomicU32,
    pub sent: Mutex<Vec<UploadTx>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            chain_id: TEST_CHAIN_ID,
            block: Some(1_000),
            balance: ethers::utils::parse_ether("1").unwrap(),
            gas_price: U256::from(1_000_000_000u64),
            nonce: U256::from(7),
            // Does not divide the deadline, so the last poll lands before it
            poll_interval: Duration::from_secs(3),
            plan: Mutex::new(VecDeque::new()),
            fallback: Confirmation::Mined(1),
            outcomes: Mutex::new(HashMap::new()),
            submit_failures: AtomicU32::new(0),
            submits: AtomicU32::new(0),
            balance_queries: AtomicU32::new(0),
            gas_price_queries: AtomicU32::new(0),
            receipt_queries: AtomicU32::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_balance(mut self, balance: U256) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Outcomes for successive submissions; `fallback` once the list runs out.
    pub fn with_confirmations(mut self, plan: Vec<Confirmation>, fallback: Confirmation) -> Self {
        self.plan = Mutex::new(plan.into());
        self.fallback = fallback;
        self
    }

    pub fn failing_submits(self, count: u32) -> Self {
        self.submit_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn submit_count(&self) -> u32 {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn receipt_count(&self) -> u32 {
        self.receipt_queries.load(Ordering::SeqCst)
    }

    fn receipt(tx_hash: TxHash, status: u64) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: tx_hash,
            status: Some(U64::from(status)),
            block_number: Some(U64::from(4242)),
            ..Default::default()
        }
    }

    /// Receipt status visible right now, if any.
    fn visible_status(&self, tx_hash: TxHash) -> Option<u64> {
        let outcomes = self.outcomes.lock().unwrap();
        let submitted = outcomes.get(&tx_hash)?;
        let elapsed = submitted.at.elapsed();
        match submitted.confirmation {
            Confirmation::Mined(status) => Some(status),
            Confirmation::Indexed { after, status } => (elapsed >= after).then_some(status),
            Confirmation::Late(status) => {
                (elapsed >= TEST_CONFIRMATION_TIMEOUT).then_some(status)
            }
            Confirmation::Dropped => None,
        }
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn endpoint(&self) -> &str {
        "mock://chain"
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> Result<u64> {
        self.block.ok_or_else(|| anyhow!("connection refused"))
    }

    async fn balance_of(&self, _address: Address) -> Result<U256> {
        self.balance_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.balance)
    }

    async fn next_nonce(&self, _address: Address) -> Result<U256> {
        Ok(self.nonce)
    }

    async fn gas_price(&self) -> Result<U256> {
        self.gas_price_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.gas_price)
    }

    async fn submit(&self, _wallet: &LocalWallet, tx: UploadTx) -> Result<TxHash> {
        let failing = self
            .submit_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(anyhow!("nonce too low"));
        }

        let n = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
        let tx_hash = TxHash::from_low_u64_be(n as u64);
        let outcome = self.plan.lock().unwrap().pop_front().unwrap_or(self.fallback);
        self.outcomes.lock().unwrap().insert(
            tx_hash,
            Submitted {
                confirmation: outcome,
                at: Instant::now(),
            },
        );
        self.sent.lock().unwrap().push(tx);
        Ok(tx_hash)
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<TransactionReceipt>> {
        self.receipt_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .visible_status(tx_hash)
            .map(|status| Self::receipt(tx_hash, status)))
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

#[derive(Default)]
pub struct MockIndexer {
    exists_plan: Mutex<VecDeque<bool>>,
    always_exists: bool,
    lookup_fails: bool,
    segment_failures: AtomicU32,
    pub checked: Mutex<Vec<String>>,
    pub segments: Mutex<Vec<SegmentRequest>>,
}

impl MockIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers for successive lookups; "absent" once the list runs out.
    pub fn with_exists(mut self, plan: Vec<bool>) -> Self {
        self.exists_plan = Mutex::new(plan.into());
        self
    }

    pub fn always_exists(mut self) -> Self {
        self.always_exists = true;
        self
    }

    pub fn unreachable_lookup(mut self) -> Self {
        self.lookup_fails = true;
        self
    }

    pub fn failing_segments(self, count: u32) -> Self {
        self.segment_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn checked(&self) -> Vec<String> {
        self.checked.lock().unwrap().clone()
    }

    pub fn segment_attempts(&self) -> usize {
        self.segments.lock().unwrap().len()
    }
}

#[async_trait]
impl StorageIndexer for MockIndexer {
    async fn file_exists(&self, root: &str) -> Result<bool> {
        self.checked.lock().unwrap().push(root.to_string());
        if self.lookup_fails {
            return Err(anyhow!("indexer unavailable"));
        }
        if self.always_exists {
            return Ok(true);
        }
        Ok(self.exists_plan.lock().unwrap().pop_front().unwrap_or(false))
    }

    async fn upload_segment(&self, segment: &SegmentRequest) -> Result<()> {
        self.segments.lock().unwrap().push(segment.clone());
        let failing = self
            .segment_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(anyhow!("HTTP status server error (503 Service Unavailable)"));
        }
        Ok(())
    }
}

pub struct MockSource {
    payload: Option<Vec<u8>>,
    pub fetches: AtomicU32,
}

impl MockSource {
    pub fn new(payload: &[u8]) -> Self {
        Self {
            payload: Some(payload.to_vec()),
            fetches: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            payload: None,
            fetches: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ContentSource for MockSource {
    async fn fetch_random(&self) -> Result<Vec<u8>, UploadError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.payload.clone().ok_or_else(|| UploadError::Fetch {
            source_url: "mock://image".to_string(),
            reason: "connection reset".to_string(),
        })
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    pub delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Key `n` as 64 hex characters; any small non-zero scalar is a valid key.
pub fn test_key(n: u64) -> String {
    format!("0x{:064x}", n)
}

pub fn test_wallet(n: u64) -> LocalWallet {
    test_key(n)
        .parse::<LocalWallet>()
        .unwrap()
        .with_chain_id(TEST_CHAIN_ID)
}

pub fn test_store(count: u64) -> KeyStore {
    let candidates: Vec<KeyCandidate> = (1..=count)
        .map(|n| KeyCandidate::new(format!("PRIVATE_KEY_{}", n), test_key(n)))
        .collect();
    KeyStore::from_candidates("test", &candidates).unwrap()
}

pub fn descriptor() -> ContentDescriptor {
    ContentDescriptor {
        root: format!("0x{}", "ab".repeat(32)),
        data: "aW1hZ2U=".to_string(),
    }
}

/// Default settings pinned to `TEST_CONFIRMATION_TIMEOUT`. Tests that wait on
/// the deadline run with the tokio clock paused.
pub fn test_settings() -> UploadSettings {
    let mut settings = UploadSettings::from_config(&StorageConfig::default()).unwrap();
    settings.confirmation_timeout = TEST_CONFIRMATION_TIMEOUT;
    settings
}

pub fn orchestrator(
    chain: Arc<MockChain>,
    indexer: Arc<MockIndexer>,
    sleeper: Arc<RecordingSleeper>,
    settings: UploadSettings,
) -> UploadOrchestrator {
    UploadOrchestrator::new(chain, indexer, sleeper, settings)
}

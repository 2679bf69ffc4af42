use crate::utils::key_store::KeyCandidate;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Aggregate counters for one scheduler run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub wallets: usize,
    pub per_wallet: u32,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl RunResult {
    pub fn new(wallets: usize, per_wallet: u32) -> Self {
        Self {
            wallets,
            per_wallet,
            ..Default::default()
        }
    }

    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }

    /// Uploads the run was asked to perform, regardless of how far it got.
    pub fn planned(&self) -> u64 {
        self.wallets as u64 * self.per_wallet as u64
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.attempted as f64) * 100.0
        }
    }
}

#[async_trait]
pub trait KeyLoader: Send + Sync {
    /// Human readable origin, used in logs and errors
    fn source_name(&self) -> String;

    /// Raw, unvalidated key entries in slot order
    async fn load_candidates(&self) -> Result<Vec<KeyCandidate>>;
}

/// Timed delays go through this so retry and pacing logic can be tested
/// without waiting on real timers.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

//! # Core Logic - Retry
//!
//! Bounded retry loop with a randomized backoff window. The delay depends only
//! on the window and the supplied RNG; the actual waiting is done through a
//! [`Sleeper`] so callers can test without real timers.

use crate::traits::Sleeper;
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay_ms: 10_000,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_delay_ms,
            max_delay_ms: max_delay_ms.max(min_delay_ms),
            ..Default::default()
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Pause before the next attempt: uniform in `[min, max]` with jitter,
    /// the lower bound without.
    pub fn calculate_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let delay_ms = if self.jitter && self.max_delay_ms > self.min_delay_ms {
            rng.gen_range(self.min_delay_ms..=self.max_delay_ms)
        } else {
            self.min_delay_ms
        };

        Duration::from_millis(delay_ms)
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` is reached. The closure receives the 1-based attempt number.
/// The last error is returned unchanged.
pub async fn with_retry<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    sleeper: &dyn Sleeper,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                error!(
                    "{} attempt {}/{} failed: {}",
                    operation_name, attempt, max_attempts, e
                );

                if !is_retryable(&e) {
                    debug!("{} error is not retryable, giving up", operation_name);
                    return Err(e);
                }
                if attempt >= max_attempts {
                    debug!(
                        "{} failed after {} attempts",
                        operation_name, max_attempts
                    );
                    return Err(e);
                }

                let delay = config.calculate_delay(&mut rand::thread_rng());
                warn!("Retrying after {:.2}s...", delay.as_secs_f64());
                sleeper.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

use async_trait::async_trait;
use core_logic::{with_retry, RetryConfig, Sleeper};
use rand::rngs::mock::StepRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    fn recorded(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.calls.lock().unwrap().push(duration);
    }
}

#[derive(Debug, PartialEq)]
enum TestError {
    Transient(u32),
    Fatal,
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Transient(n) => write!(f, "transient #{}", n),
            TestError::Fatal => write!(f, "fatal"),
        }
    }
}

fn retryable(e: &TestError) -> bool {
    matches!(e, TestError::Transient(_))
}

#[tokio::test]
async fn test_retry_success_first_try() {
    let counter = AtomicUsize::new(0);
    let sleeper = RecordingSleeper::default();
    let config = RetryConfig::default();

    let result: Result<&str, TestError> =
        with_retry(&config, "test_op", &sleeper, retryable, |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok("success") }
        })
        .await;

    assert_eq!(result, Ok("success"));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(sleeper.recorded().is_empty());
}

#[tokio::test]
async fn test_retry_success_after_failures() {
    let sleeper = RecordingSleeper::default();
    let config = RetryConfig::default();

    let result: Result<u32, TestError> =
        with_retry(&config, "test_op", &sleeper, retryable, |attempt| async move {
            if attempt < 3 {
                Err(TestError::Transient(attempt))
            } else {
                Ok(attempt)
            }
        })
        .await;

    assert_eq!(result, Ok(3));
    assert_eq!(sleeper.recorded().len(), 2);
}

#[tokio::test]
async fn test_retry_exhaustion_returns_last_error_with_bounded_backoff() {
    let counter = AtomicUsize::new(0);
    let sleeper = RecordingSleeper::default();
    let config = RetryConfig::new(3, 10_000, 30_000);

    let result: Result<(), TestError> =
        with_retry(&config, "test_op", &sleeper, retryable, |attempt| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Err(TestError::Transient(attempt)) }
        })
        .await;

    assert_eq!(result, Err(TestError::Transient(3)));
    assert_eq!(counter.load(Ordering::SeqCst), 3);

    let delays = sleeper.recorded();
    assert_eq!(delays.len(), 2);
    for delay in delays {
        assert!(delay >= Duration::from_secs(10), "delay too short: {:?}", delay);
        assert!(delay <= Duration::from_secs(30), "delay too long: {:?}", delay);
    }
}

#[tokio::test]
async fn test_non_retryable_error_stops_immediately() {
    let counter = AtomicUsize::new(0);
    let sleeper = RecordingSleeper::default();
    let config = RetryConfig::default();

    let result: Result<(), TestError> =
        with_retry(&config, "test_op", &sleeper, retryable, |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::Fatal) }
        })
        .await;

    assert_eq!(result, Err(TestError::Fatal));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(sleeper.recorded().is_empty());
}

#[test]
fn test_delay_without_jitter_is_lower_bound() {
    let config = RetryConfig::new(3, 10_000, 30_000).without_jitter();
    let mut rng = StepRng::new(0, 1);
    assert_eq!(config.calculate_delay(&mut rng), Duration::from_secs(10));
    assert_eq!(config.calculate_delay(&mut rng), Duration::from_secs(10));
}

#[test]
fn test_jittered_delay_stays_in_window() {
    let config = RetryConfig::default();
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let delay = config.calculate_delay(&mut rng);
        assert!(delay >= Duration::from_secs(10));
        assert!(delay <= Duration::from_secs(30));
    }
}

//! # Core Logic - Shared Utilities
//!
//! Chain-agnostic building blocks used by the chain crates: key loading and
//! validation, typed setup errors, retry with randomized backoff, logging and
//! shutdown handling.
//!
//! ## Modules
//!
//! - [`config`] - Configuration structures shared between chains
//! - [`error`] - Typed error handling with thiserror
//! - [`traits`] - Core trait definitions (key loaders, sleepers, run counters)
//! - `utils` - Key store, retry, logger, shutdown signal

pub mod config;
pub mod error;
pub mod traits;
pub(crate) mod utils;

pub use config::{ChainConfig, WalletSource};
pub use error::{ConfigError, CoreError, InputError, NetworkError, WalletError};
pub use traits::{KeyLoader, RunResult, Sleeper, TokioSleeper};

pub use utils::{
    next_index, setup_logger, Credential, EnvKeyLoader, FileKeyLoader, KeyCandidate, KeyCursor,
    KeyStore, ShutdownSignal,
};

pub use utils::retry::{with_retry, RetryConfig};

//! # Core Error Types
//!
//! Centralized setup-phase error definitions for the core-logic crate.
//! Anything surfacing here is fatal to the process: the binary logs it and
//! exits with a non-zero status.

use thiserror::Error;

/// Unified error type for setup-phase operations.
///
/// This enum wraps all specific error types and provides a unified
/// error interface for the application layer.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(ConfigError),

    #[error(transparent)]
    Wallet(WalletError),

    #[error(transparent)]
    Network(NetworkError),

    #[error(transparent)]
    Input(InputError),
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        CoreError::Config(e)
    }
}

impl From<WalletError> for CoreError {
    fn from(e: WalletError) -> Self {
        CoreError::Wallet(e)
    }
}

impl From<NetworkError> for CoreError {
    fn from(e: NetworkError) -> Self {
        CoreError::Network(e)
    }
}

impl From<InputError> for CoreError {
    fn from(e: InputError) -> Self {
        CoreError::Input(e)
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("No valid private keys found in {source_name} ({checked} candidate(s) checked). Set PRIVATE_KEY_1, PRIVATE_KEY_2, ... or PRIVATE_KEY")]
    NoValidKeys { source_name: String, checked: usize },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },
}

/// Private key validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Wallet not found at index {index} (total wallets: {total})")]
    NotFound { index: usize, total: usize },

    #[error("Invalid private key format: expected hex string")]
    InvalidKeyFormat,

    #[error("Invalid private key length: expected 64 hex chars, got {length}")]
    InvalidKeyLength { length: usize },
}

/// Network identity and reachability errors
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Invalid chainId: expected {expected}, got {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    #[error("Network is not synced at {endpoint}. Please check RPC connection")]
    NotSynced { endpoint: String },

    #[error("Connection refused to {endpoint}: {reason}")]
    ConnectionRefused { endpoint: String, reason: String },
}

/// Operator input errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Invalid number '{input}'. Please enter a number greater than 0")]
    InvalidCount { input: String },

    #[error("Cannot read operator input: {reason}")]
    Unavailable { reason: String },
}

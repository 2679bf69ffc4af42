//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

pub(crate) mod key_store;
pub(crate) mod logger;
pub(crate) mod retry;
pub(crate) mod runner;

pub use key_store::{
    next_index, Credential, EnvKeyLoader, FileKeyLoader, KeyCandidate, KeyCursor, KeyStore,
};
pub use logger::setup_logger;
pub use runner::ShutdownSignal;

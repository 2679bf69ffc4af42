//! 0G Storage Uploader - automated file uploads to the 0G Galileo testnet
//!
//! Fetches random images, gives each one a fresh content root, pushes it to
//! the storage indexer as a single segment and registers it on-chain through
//! the flow contract. Runs over every configured wallet, one upload at a time.
//!
//! # Architecture
//!
//! - **[`content::ContentSource`]**: random image download with rotating
//!   browser identities
//! - **[`content::ContentAddresser`]**: salted SHA-256 roots, re-rolled on
//!   indexer collisions
//! - **[`indexer::StorageIndexer`]**: existence lookups and segment uploads
//! - **[`chain::ChainClient`]**: ethers-based RPC access and receipt tracking
//! - **[`uploader::UploadOrchestrator`]**: one upload with bounded retries
//! - **[`scheduler::RunScheduler`]**: wallets in order, `count` uploads each
//!
//! # Quick Start
//!
//! ```bash
//! # PRIVATE_KEY_1, PRIVATE_KEY_2, ... in the environment or .env
//! cargo run -p zerog-storage -- --count 5
//! ```
//!
//! Settings are read from `chains/zerog-storage/config.toml`; every field is
//! optional. See [`config::StorageConfig`].

pub mod chain;
pub mod config;
pub mod content;
pub mod error;
pub mod http;
pub mod indexer;
pub mod scheduler;
pub mod uploader;

pub use error::UploadError;

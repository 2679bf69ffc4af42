//! # Core Logic - Key Store
//!
//! Loads signing keys once at startup, validates them, and exposes them as an
//! ordered, immutable list. Slot discovery is delegated to a [`KeyLoader`];
//! the store itself only validates and indexes.

use crate::error::{ConfigError, CoreError, WalletError};
use crate::traits::KeyLoader;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// A raw key entry as read from its slot, before validation.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyCandidate {
    pub label: String,
    pub raw: String,
}

impl KeyCandidate {
    pub fn new(label: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            raw: raw.into(),
        }
    }
}

impl fmt::Debug for KeyCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCandidate")
            .field("label", &self.label)
            .field("raw", &"***REDACTED***")
            .finish()
    }
}

/// A validated 32-byte secp256k1 private key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    label: String,
    bytes: [u8; 32],
}

impl Credential {
    pub const KEY_BYTES: usize = 32;

    /// Trims whitespace, accepts an optional `0x` prefix and requires exactly
    /// 64 hex characters.
    pub fn parse(label: &str, raw: &str) -> Result<Self, WalletError> {
        let trimmed = raw.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex_part.len() != Self::KEY_BYTES * 2 {
            return Err(WalletError::InvalidKeyLength {
                length: hex_part.len(),
            });
        }

        let decoded =
            Zeroizing::new(hex::decode(hex_part).map_err(|_| WalletError::InvalidKeyFormat)?);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded);

        Ok(Self {
            label: label.to_string(),
            bytes,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("label", &self.label)
            .field("key", &"***REDACTED***")
            .finish()
    }
}

/// Ordered collection of validated credentials. Never empty.
#[derive(Debug, Clone)]
pub struct KeyStore {
    keys: Vec<Credential>,
}

impl KeyStore {
    /// Validates every candidate, logging and skipping the invalid ones.
    /// Fails only when nothing valid remains.
    pub fn from_candidates(
        source_name: &str,
        candidates: &[KeyCandidate],
    ) -> Result<Self, ConfigError> {
        let mut keys = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            match Credential::parse(&candidate.label, &candidate.raw) {
                Ok(credential) => keys.push(credential),
                Err(e) => error!("Invalid private key at {}: {}", candidate.label, e),
            }
        }

        if keys.is_empty() {
            return Err(ConfigError::NoValidKeys {
                source_name: source_name.to_string(),
                checked: candidates.len(),
            });
        }

        Ok(Self { keys })
    }

    pub async fn load(loader: &dyn KeyLoader) -> Result<Self, CoreError> {
        let source_name = loader.source_name();
        let candidates =
            loader
                .load_candidates()
                .await
                .map_err(|e| ConfigError::IoError {
                    path: source_name.clone(),
                    msg: format!("{:#}", e),
                })?;

        let store = Self::from_candidates(&source_name, &candidates)?;
        info!(
            "Loaded {} private key(s) from {}",
            store.len(),
            source_name
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Credential, WalletError> {
        self.keys.get(index).ok_or(WalletError::NotFound {
            index,
            total: self.keys.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.keys.iter()
    }
}

/// Index following `index` in a list of `len` keys, wrapping around.
pub fn next_index(len: usize, index: usize) -> usize {
    if len == 0 {
        0
    } else {
        (index + 1) % len
    }
}

/// Explicit position in a [`KeyStore`], owned by whoever drives the run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyCursor {
    index: usize,
}

impl KeyCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, store: &KeyStore, index: usize) -> Result<(), WalletError> {
        store.get(index)?;
        self.index = index;
        Ok(())
    }

    pub fn current<'a>(&self, store: &'a KeyStore) -> Result<&'a Credential, WalletError> {
        store.get(self.index)
    }

    pub fn rotate<'a>(&mut self, store: &'a KeyStore) -> Result<&'a Credential, WalletError> {
        self.index = next_index(store.len(), self.index);
        store.get(self.index)
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads `{prefix}_1`, `{prefix}_2`, ... until the first empty slot. A bare
/// `{prefix}` variable stands in for slot 1 when `{prefix}_1` is unset.
pub struct EnvKeyLoader {
    prefix: String,
    lookup: EnvLookup,
}

impl EnvKeyLoader {
    pub fn new(prefix: &str) -> Self {
        Self::with_lookup(prefix, |name| std::env::var(name).ok())
    }

    pub fn with_lookup<F>(prefix: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            prefix: prefix.to_string(),
            lookup: Box::new(lookup),
        }
    }

    fn read(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    pub fn scan(&self) -> Vec<KeyCandidate> {
        let mut candidates = Vec::new();
        let mut index = 1;

        loop {
            let slot = format!("{}_{}", self.prefix, index);
            let entry = match self.read(&slot) {
                Some(value) => Some(KeyCandidate::new(slot, value)),
                None if index == 1 => self
                    .read(&self.prefix)
                    .map(|value| KeyCandidate::new(self.prefix.clone(), value)),
                None => None,
            };

            match entry {
                Some(candidate) => candidates.push(candidate),
                None => break,
            }
            index += 1;
        }

        candidates
    }
}

#[async_trait]
impl KeyLoader for EnvKeyLoader {
    fn source_name(&self) -> String {
        format!("environment ({}_N)", self.prefix)
    }

    async fn load_candidates(&self) -> Result<Vec<KeyCandidate>> {
        Ok(self.scan())
    }
}

/// One raw key per line; blank lines and `#` comments are ignored.
#[derive(Debug, Clone)]
pub struct FileKeyLoader {
    path: PathBuf,
}

impl FileKeyLoader {
    pub const DEFAULT_FILE: &'static str = "pv.txt";

    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileKeyLoader {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FILE)
    }
}

#[async_trait]
impl KeyLoader for FileKeyLoader {
    fn source_name(&self) -> String {
        self.path.display().to_string()
    }

    async fn load_candidates(&self) -> Result<Vec<KeyCandidate>> {
        let content = Zeroizing::new(
            tokio::fs::read_to_string(&self.path)
                .await
                .with_context(|| format!("Failed to read key file {}", self.path.display()))?,
        );

        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("keys");

        Ok(content
            .lines()
            .enumerate()
            .filter_map(|(i, line)| {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    None
                } else {
                    Some(KeyCandidate::new(format!("{}:{}", name, i + 1), trimmed))
                }
            })
            .collect())
    }
}

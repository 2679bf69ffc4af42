//! Salted content addressing.
//!
//! The same image can be served twice by a provider, so the root is not a
//! pure function of the payload: a random salt and the current time go into
//! the digest, and the indexer is asked whether the result is already taken.

use super::ContentDescriptor;
use crate::error::UploadError;
use crate::indexer::StorageIndexer;
use base64::prelude::*;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

/// `0x`-prefixed SHA-256 of `payload || hex(salt) || decimal(timestamp_ms)`.
pub fn content_digest(payload: &[u8], salt: &[u8; 16], timestamp_ms: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hasher.update(hex::encode(salt).as_bytes());
    hasher.update(timestamp_ms.to_string().as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

pub struct ContentAddresser {
    indexer: Arc<dyn StorageIndexer>,
    max_attempts: u32,
}

impl ContentAddresser {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    pub fn new(indexer: Arc<dyn StorageIndexer>) -> Self {
        Self {
            indexer,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub async fn address_content(&self, payload: &[u8]) -> Result<ContentDescriptor, UploadError> {
        for attempt in 1..=self.max_attempts {
            let salt: [u8; 16] = rand::random();
            let timestamp_ms = Utc::now().timestamp_millis();
            let root = content_digest(payload, &salt, timestamp_ms);

            info!("Checking file hash {}...", root);
            // An unreachable indexer is not proof of a collision
            let exists = match self.indexer.file_exists(&root).await {
                Ok(exists) => exists,
                Err(e) => {
                    warn!("Failed to check file hash: {:#}", e);
                    false
                }
            };

            if exists {
                warn!(
                    "Hash {} already exists, retrying with new salt/timestamp ({}/{})",
                    root, attempt, self.max_attempts
                );
                continue;
            }

            info!("Generated unique file hash: {}", root);
            return Ok(ContentDescriptor {
                root,
                data: BASE64_STANDARD.encode(payload),
            });
        }

        Err(UploadError::AddressingExhausted {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_shape() {
        let root = content_digest(b"image", &[7u8; 16], 1_700_000_000_000);
        assert!(root.starts_with("0x"));
        assert_eq!(root.len(), 66);
        assert!(root[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_digest_depends_on_salt_and_timestamp() {
        let base = content_digest(b"image", &[1u8; 16], 1000);
        assert_eq!(base, content_digest(b"image", &[1u8; 16], 1000));
        assert_ne!(base, content_digest(b"image", &[2u8; 16], 1000));
        assert_ne!(base, content_digest(b"image", &[1u8; 16], 1001));
    }

    #[test]
    fn test_digest_hashes_text_forms() {
        let salt = [0xabu8; 16];
        let mut input = b"payload".to_vec();
        input.extend_from_slice(hex::encode(salt).as_bytes());
        input.extend_from_slice(b"42");
        let expected = format!("0x{}", hex::encode(Sha256::digest(&input)));
        assert_eq!(content_digest(b"payload", &salt, 42), expected);
    }
}

//! Storage indexer HTTP API: existence lookups and single-segment uploads.

use crate::content::ContentDescriptor;
use crate::http::browser_headers;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentProof {
    pub siblings: Vec<String>,
    pub path: Vec<String>,
}

/// Body of `POST /file/segment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRequest {
    pub root: String,
    pub index: u64,
    pub data: String,
    pub proof: SegmentProof,
}

impl SegmentRequest {
    /// Whole payload as segment 0 with a one-node proof (the root itself).
    pub fn single(descriptor: &ContentDescriptor) -> Self {
        Self {
            root: descriptor.root.clone(),
            index: 0,
            data: descriptor.data.clone(),
            proof: SegmentProof {
                siblings: vec![descriptor.root.clone()],
                path: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileInfo {
    #[serde(default)]
    exists: bool,
}

#[async_trait]
pub trait StorageIndexer: Send + Sync {
    /// Whether the indexer already knows a file with this root.
    async fn file_exists(&self, root: &str) -> Result<bool>;

    async fn upload_segment(&self, segment: &SegmentRequest) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct HttpIndexer {
    client: Client,
    base_url: String,
}

impl HttpIndexer {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StorageIndexer for HttpIndexer {
    async fn file_exists(&self, root: &str) -> Result<bool> {
        let url = format!("{}/file/info/{}", self.base_url, root);
        debug!("GET {}", url);

        let info: FileInfo = self
            .client
            .get(&url)
            .headers(browser_headers())
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()?
            .json()
            .await
            .context("Invalid file info response")?;

        Ok(info.exists)
    }

    async fn upload_segment(&self, segment: &SegmentRequest) -> Result<()> {
        let url = format!("{}/file/segment", self.base_url);
        debug!("POST {} (root {})", url, segment.root);

        self.client
            .post(&url)
            .headers(browser_headers())
            .json(segment)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()?;

        Ok(())
    }
}

use crate::error::UploadError;
use crate::http::browser_headers;
use anyhow::Result;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use tracing::info;

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Raw bytes from one randomly chosen provider. Not retried here.
    async fn fetch_random(&self) -> Result<Vec<u8>, UploadError>;
}

/// Public random-image endpoints fetched as binary.
#[derive(Debug, Clone)]
pub struct HttpContentSource {
    client: Client,
    sources: Vec<String>,
}

impl HttpContentSource {
    pub fn new(client: Client, sources: Vec<String>) -> Result<Self> {
        if sources.is_empty() {
            anyhow::bail!("No image sources configured");
        }
        Ok(Self { client, sources })
    }

    fn pick_source(&self) -> &str {
        self.sources
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(self.sources[0].as_str())
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn fetch_random(&self) -> Result<Vec<u8>, UploadError> {
        let source_url = self.pick_source().to_string();
        info!("Fetching random image from {}...", source_url);

        let fetch_error = |reason: String| UploadError::Fetch {
            source_url: source_url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&source_url)
            .headers(browser_headers())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch_error(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        if bytes.is_empty() {
            return Err(fetch_error("empty response body".to_string()));
        }

        info!("Image fetched successfully ({} bytes)", bytes.len());
        Ok(bytes.to_vec())
    }
}

//! Ranking page fetcher.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::SourceConfig;
use crate::utils::http::{create_async_client, fetch_text};
use crate::utils::page_url;

/// Fetches the raw markup of one list page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page starting at item `offset`.
    async fn fetch(&self, offset: usize) -> Result<String>;
}

/// Fetches list pages over HTTP with a browser-like User-Agent.
pub struct HttpPageFetcher {
    client: Client,
    base_url: String,
}

impl HttpPageFetcher {
    /// Create a fetcher from the source configuration.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, offset: usize) -> Result<String> {
        let url = page_url(&self.base_url, offset);
        log::debug!("Fetching {}", url);

        let (status, body) = fetch_text(&self.client, &url).await?;
        if !status.is_success() {
            // Throttled pages are parsed anyway; they come back short and
            // the builder waits and retries the whole pass.
            log::warn!("{} answered {} ({} bytes)", url, status, body.len());
        }
        Ok(body)
    }
}

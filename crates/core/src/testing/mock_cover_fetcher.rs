//! Mock cover fetcher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::stage::{CoverFetcher, FetchError};

use super::fixtures;

/// Mock implementation of the CoverFetcher trait.
///
/// Returns a small PNG for every url unless an error is queued.
#[derive(Debug)]
pub struct MockCoverFetcher {
    fetched: Arc<RwLock<Vec<String>>>,
    image: Arc<RwLock<Vec<u8>>>,
    next_error: Arc<RwLock<Option<FetchError>>>,
}

impl Default for MockCoverFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCoverFetcher {
    pub fn new() -> Self {
        Self {
            fetched: Arc::new(RwLock::new(Vec::new())),
            image: Arc::new(RwLock::new(fixtures::cover_png(8, 8))),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Bytes returned by subsequent fetches.
    pub async fn set_image(&self, bytes: Vec<u8>) {
        *self.image.write().await = bytes;
    }

    /// The next fetch fails with `error`.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetched.read().await.len()
    }

    pub async fn fetched_urls(&self) -> Vec<String> {
        self.fetched.read().await.clone()
    }
}

#[async_trait]
impl CoverFetcher for MockCoverFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetched.write().await.push(url.to_string());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        Ok(self.image.read().await.clone())
    }
}

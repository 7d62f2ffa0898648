//! Mock fetch primitive for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::fetcher::{FetchError, HttpFetcher};

/// Mock implementation of the fetch primitive.
///
/// URLs answer with scripted payloads or scripted failures; anything
/// unscripted fails with a connection error. Every request is recorded
/// in order for assertions.
pub struct MockFetcher {
    responses: RwLock<HashMap<String, Result<Vec<u8>, FetchError>>>,
    requests: RwLock<Vec<String>>,
    delay: RwLock<Option<Duration>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            responses: RwLock::new(HashMap::new()),
            requests: RwLock::new(Vec::new()),
            delay: RwLock::new(None),
        }
    }

    /// Script a successful payload for a URL.
    pub async fn respond(&self, url: &str, body: Vec<u8>) {
        self.responses.write().await.insert(url.to_string(), Ok(body));
    }

    /// Script a failure for a URL.
    pub async fn fail(&self, url: &str, error: FetchError) {
        self.responses.write().await.insert(url.to_string(), Err(error));
    }

    /// Delay every response, scripted or not.
    pub async fn delay_responses(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Every URL fetched so far, in request order.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl HttpFetcher for MockFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
        self.requests.write().await.push(url.to_string());

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.responses.read().await.get(url) {
            Some(response) => response.clone(),
            None => Err(FetchError::ConnectionFailed(format!(
                "no mock response for {url}"
            ))),
        }
    }
}

//! Health probing for mirror domains.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::fetcher::HttpFetcher;

/// Decides whether a domain currently serves content.
///
/// Probes run out-of-band from searches; the alias manager only consults
/// the cached state they leave behind.
#[async_trait]
pub trait DomainProbe: Send + Sync {
    async fn is_online(&self, domain: &str) -> bool;
}

/// Default probe: a plain GET against the domain root through the fetch
/// primitive. Any successful response counts as online.
pub struct HttpProbe {
    fetcher: Arc<dyn HttpFetcher>,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }
}

#[async_trait]
impl DomainProbe for HttpProbe {
    async fn is_online(&self, domain: &str) -> bool {
        let url = format!("https://{}/", domain);
        let online = self.fetcher.fetch(&url, self.timeout).await.is_ok();
        debug!(domain = %domain, online = online, "Domain probe");
        online
    }
}

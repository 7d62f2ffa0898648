//! Mock domain probe for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::DomainProbe;

/// Mock implementation of the domain probe.
///
/// Domains not explicitly set online report as offline. Probed domains
/// are recorded for assertions.
pub struct MockProbe {
    online: RwLock<HashMap<String, bool>>,
    probed: RwLock<Vec<String>>,
}

impl Default for MockProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProbe {
    pub fn new() -> Self {
        Self {
            online: RwLock::new(HashMap::new()),
            probed: RwLock::new(Vec::new()),
        }
    }

    pub async fn set_online(&self, domain: &str, online: bool) {
        self.online.write().await.insert(domain.to_string(), online);
    }

    /// Every domain probed so far, in probe order.
    pub async fn probed_domains(&self) -> Vec<String> {
        self.probed.read().await.clone()
    }
}

#[async_trait]
impl DomainProbe for MockProbe {
    async fn is_online(&self, domain: &str) -> bool {
        self.probed.write().await.push(domain.to_string());
        self.online.read().await.get(domain).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_domains_are_offline() {
        let probe = MockProbe::new();
        assert!(!probe.is_online("m1.example.com").await);
        assert_eq!(probe.probed_domains().await, vec!["m1.example.com"]);
    }

    #[tokio::test]
    async fn test_configured_domain_is_online() {
        let probe = MockProbe::new();
        probe.set_online("m1.example.com", true).await;
        assert!(probe.is_online("m1.example.com").await);
    }
}

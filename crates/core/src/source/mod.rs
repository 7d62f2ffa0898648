//! Source registry: named sources, each pairing a compiled rule with
//! the long-lived alias manager shared by every performer addressing
//! that source.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::{Config, ConfigError};
use crate::domain::{DomainAliasManager, DomainProbe};
use crate::fetcher::HttpFetcher;
use crate::performer::{
    CrawlingPerformer, PagedListingPerformer, SearchPerformer, SearchToken,
    SingleListingPerformer,
};
use crate::rule::CompiledRule;

struct SearchSource {
    rule: Arc<CompiledRule>,
    domains: Arc<DomainAliasManager>,
}

/// All configured sources, able to mint performers for a
/// `(token, keywords)` request.
pub struct SourceRegistry {
    fetch_timeout: Duration,
    fetcher: Arc<dyn HttpFetcher>,
    sources: HashMap<String, SearchSource>,
}

impl SourceRegistry {
    /// Build the registry from configuration, seeding each source's
    /// alias manager with its configured mirrors.
    pub async fn from_config(
        config: &Config,
        fetcher: Arc<dyn HttpFetcher>,
        probe: Arc<dyn DomainProbe>,
    ) -> Result<Self, ConfigError> {
        let mut sources = HashMap::new();
        for source in &config.sources {
            let rule = CompiledRule::compile(source.clone())
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

            let domains = Arc::new(DomainAliasManager::new(&source.default_domain, probe.clone()));
            domains.set_aliases(&source.aliases).await;

            debug!(
                source = %source.name,
                default_domain = %source.default_domain,
                aliases = source.aliases.len(),
                "Source registered"
            );
            sources.insert(
                source.name.clone(),
                SearchSource {
                    rule: Arc::new(rule),
                    domains,
                },
            );
        }

        Ok(Self {
            fetch_timeout: Duration::from_secs(config.engine.fetch_timeout_secs),
            fetcher,
            sources,
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    /// The shared alias manager for a source.
    pub fn domains(&self, source: &str) -> Option<Arc<DomainAliasManager>> {
        self.sources.get(source).map(|s| s.domains.clone())
    }

    /// Mint a performer for one query against one source. The variant
    /// follows the source configuration: paged or single-page listing,
    /// wrapped in the crawling decorator when the rule crawls.
    pub fn performer(
        &self,
        source: &str,
        token: SearchToken,
        keywords: &str,
    ) -> Option<Arc<dyn SearchPerformer>> {
        let entry = self.sources.get(source)?;
        let rule = entry.rule.clone();
        let domains = Some(entry.domains.clone());
        let crawls = rule.rule().max_crawls > 0;

        let performer: Arc<dyn SearchPerformer> = match (rule.rule().paged, crawls) {
            (true, true) => Arc::new(CrawlingPerformer::new(PagedListingPerformer::new(
                token,
                keywords,
                self.fetch_timeout,
                self.fetcher.clone(),
                rule,
                domains,
            ))),
            (true, false) => Arc::new(PagedListingPerformer::new(
                token,
                keywords,
                self.fetch_timeout,
                self.fetcher.clone(),
                rule,
                domains,
            )),
            (false, true) => Arc::new(CrawlingPerformer::new(SingleListingPerformer::new(
                token,
                keywords,
                self.fetch_timeout,
                self.fetcher.clone(),
                rule,
                domains,
            ))),
            (false, false) => Arc::new(SingleListingPerformer::new(
                token,
                keywords,
                self.fetch_timeout,
                self.fetcher.clone(),
                rule,
                domains,
            )),
        };
        Some(performer)
    }

    /// Run a health-maintenance pass over every source's alias list.
    pub async fn check_statuses(&self) {
        for source in self.sources.values() {
            source.domains.check_statuses().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockFetcher, MockProbe};

    async fn registry(sources: Vec<crate::rule::SearchRule>) -> SourceRegistry {
        let config = Config {
            engine: Default::default(),
            sources,
        };
        SourceRegistry::from_config(
            &config,
            Arc::new(MockFetcher::new()),
            Arc::new(MockProbe::new()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_registry_seeds_alias_managers() {
        let mut rule = fixtures::plain_rule();
        rule.aliases = vec!["m1.example.com".to_string(), "m2.example.com".to_string()];

        let registry = registry(vec![rule]).await;
        let domains = registry.domains("testsource").unwrap();
        assert_eq!(domains.default_domain(), "example.com");
        assert_eq!(domains.aliases().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_source_has_no_performer() {
        let registry = registry(vec![fixtures::plain_rule()]).await;
        assert!(registry.performer("nope", 1, "x").is_none());
    }

    #[tokio::test]
    async fn test_performer_carries_token_and_keywords() {
        let registry = registry(vec![fixtures::crawl_rule()]).await;
        let performer = registry.performer("testsource", 42, "  big  buck ").unwrap();
        assert_eq!(performer.token(), 42);
        assert_eq!(performer.keywords(), "big buck");
        assert!(!performer.is_stopped());
    }

    #[tokio::test]
    async fn test_bad_rule_fails_registry_build() {
        let mut rule = fixtures::plain_rule();
        rule.listing_pattern = "(?<title>unclosed".to_string();
        let config = Config {
            engine: Default::default(),
            sources: vec![rule],
        };
        let result = SourceRegistry::from_config(
            &config,
            Arc::new(MockFetcher::new()),
            Arc::new(MockProbe::new()),
        )
        .await;
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}

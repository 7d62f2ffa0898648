//! Listing-phase performers: the paged page walker and the simpler
//! single-page variant.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::DomainAliasManager;
use crate::fetcher::HttpFetcher;
use crate::rule::CompiledRule;

use super::error::PerformerError;
use super::types::{ResultSink, SearchResult, SearchToken};
use super::{ListingPerformer, SearchPerformer};

/// State shared by every listing performer: identity, limits, the stop
/// flag, and the collaborators a page fetch needs.
pub(super) struct PerformerContext {
    token: SearchToken,
    keywords: String,
    encoded_keywords: String,
    timeout: Duration,
    stopped: AtomicBool,
    fetcher: Arc<dyn HttpFetcher>,
    rule: Arc<CompiledRule>,
    domains: Option<Arc<DomainAliasManager>>,
}

impl PerformerContext {
    pub(super) fn new(
        token: SearchToken,
        keywords: &str,
        timeout: Duration,
        fetcher: Arc<dyn HttpFetcher>,
        rule: Arc<CompiledRule>,
        domains: Option<Arc<DomainAliasManager>>,
    ) -> Self {
        let keywords = sanitize_keywords(keywords);
        let encoded_keywords = urlencoding::encode(&keywords).into_owned();
        Self {
            token,
            keywords,
            encoded_keywords,
            timeout,
            stopped: AtomicBool::new(false),
            fetcher,
            rule,
            domains,
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Hostname this run should address, consulting the shared alias
    /// manager when the source has one.
    async fn domain_name(&self) -> String {
        match &self.domains {
            Some(domains) => domains.domain_name_to_use().await,
            None => self.rule.default_domain().to_string(),
        }
    }

    /// A first-page fetch failure against a mirror is the signal that the
    /// mirror is gone; the default domain is only flipped by probes.
    async fn mark_offline_if_alias(&self, domain: &str) {
        if let Some(domains) = &self.domains {
            if domain != domains.default_domain() {
                domains.mark_domain_offline(domain).await;
            }
        }
    }

    /// The slice of a listing batch that may be emitted right away:
    /// crawlable results are withheld until their crawl succeeds unless
    /// the rule explicitly allows the preliminary form.
    fn listing_batch(&self, results: &[SearchResult]) -> Vec<SearchResult> {
        let emit_preliminary = self.rule.rule().emit_preliminary;
        results
            .iter()
            .filter(|r| emit_preliminary || !r.is_crawlable())
            .cloned()
            .collect()
    }
}

/// Collapse runs of whitespace so keyword encoding stays stable.
fn sanitize_keywords(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

macro_rules! delegate_performer_identity {
    () => {
        fn token(&self) -> SearchToken {
            self.ctx.token
        }

        fn keywords(&self) -> &str {
            &self.ctx.keywords
        }

        fn timeout(&self) -> Duration {
            self.ctx.timeout
        }

        fn stop(&self) {
            self.ctx.stopped.store(true, Ordering::SeqCst);
        }

        fn is_stopped(&self) -> bool {
            self.ctx.is_stopped()
        }
    };
}

/// Walks listing pages sequentially: page n+1 is never requested before
/// page n is processed, since the stop conditions depend on accumulated
/// counts.
pub struct PagedListingPerformer {
    ctx: PerformerContext,
}

impl PagedListingPerformer {
    pub fn new(
        token: SearchToken,
        keywords: &str,
        timeout: Duration,
        fetcher: Arc<dyn HttpFetcher>,
        rule: Arc<CompiledRule>,
        domains: Option<Arc<DomainAliasManager>>,
    ) -> Self {
        Self {
            ctx: PerformerContext::new(token, keywords, timeout, fetcher, rule, domains),
        }
    }
}

#[async_trait]
impl SearchPerformer for PagedListingPerformer {
    delegate_performer_identity!();

    async fn perform(&self, sink: &ResultSink) -> Result<(), PerformerError> {
        self.run_listing(sink).await.map(|_| ())
    }
}

#[async_trait]
impl ListingPerformer for PagedListingPerformer {
    async fn run_listing(&self, sink: &ResultSink) -> Result<Vec<SearchResult>, PerformerError> {
        let ctx = &self.ctx;
        let limits = ctx.rule.rule();
        let mut collected: Vec<SearchResult> = Vec::new();

        for page in 1..=limits.max_pages {
            if ctx.is_stopped() {
                break;
            }

            let domain = ctx.domain_name().await;
            let url = ctx.rule.listing_page_url(&domain, page, &ctx.encoded_keywords);
            let bytes = match ctx.fetcher.fetch(&url, ctx.timeout).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(
                        source = %ctx.rule.name(),
                        page = page,
                        domain = %domain,
                        error = %e,
                        "Listing fetch failed"
                    );
                    if page == 1 {
                        ctx.mark_offline_if_alias(&domain).await;
                    }
                    break;
                }
            };

            let html = String::from_utf8_lossy(&bytes);
            let remaining = limits.max_results.saturating_sub(collected.len());
            let limit = remaining.min(limits.max_results_per_page);
            let page_results = ctx.rule.extract_listing(&html, &domain, limit);
            if page_results.is_empty() {
                debug!(
                    source = %ctx.rule.name(),
                    page = page,
                    "No matches on listing page, source exhausted"
                );
                break;
            }

            debug!(
                source = %ctx.rule.name(),
                page = page,
                results = page_results.len(),
                "Listing page extracted"
            );

            if ctx.is_stopped() {
                break;
            }
            sink.emit(ctx.listing_batch(&page_results));
            collected.extend(page_results);

            if collected.len() >= limits.max_results {
                debug!(source = %ctx.rule.name(), "Result cap reached");
                break;
            }
        }

        Ok(collected)
    }

    fn rule(&self) -> &Arc<CompiledRule> {
        &self.ctx.rule
    }

    fn fetcher(&self) -> &Arc<dyn HttpFetcher> {
        &self.ctx.fetcher
    }
}

/// Single-pattern variant for sources with no page parameter: one page,
/// one pattern, capped matches.
pub struct SingleListingPerformer {
    ctx: PerformerContext,
}

impl SingleListingPerformer {
    pub fn new(
        token: SearchToken,
        keywords: &str,
        timeout: Duration,
        fetcher: Arc<dyn HttpFetcher>,
        rule: Arc<CompiledRule>,
        domains: Option<Arc<DomainAliasManager>>,
    ) -> Self {
        Self {
            ctx: PerformerContext::new(token, keywords, timeout, fetcher, rule, domains),
        }
    }
}

#[async_trait]
impl SearchPerformer for SingleListingPerformer {
    delegate_performer_identity!();

    async fn perform(&self, sink: &ResultSink) -> Result<(), PerformerError> {
        self.run_listing(sink).await.map(|_| ())
    }
}

#[async_trait]
impl ListingPerformer for SingleListingPerformer {
    async fn run_listing(&self, sink: &ResultSink) -> Result<Vec<SearchResult>, PerformerError> {
        let ctx = &self.ctx;
        if ctx.is_stopped() {
            return Ok(Vec::new());
        }

        let domain = ctx.domain_name().await;
        let url = ctx.rule.listing_page_url(&domain, 1, &ctx.encoded_keywords);
        let bytes = match ctx.fetcher.fetch(&url, ctx.timeout).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    source = %ctx.rule.name(),
                    domain = %domain,
                    error = %e,
                    "Listing fetch failed"
                );
                ctx.mark_offline_if_alias(&domain).await;
                return Ok(Vec::new());
            }
        };

        let html = String::from_utf8_lossy(&bytes);
        let limits = ctx.rule.rule();
        let limit = limits.max_results_per_page.min(limits.max_results);
        let results = ctx.rule.extract_listing(&html, &domain, limit);
        debug!(
            source = %ctx.rule.name(),
            results = results.len(),
            "Listing page extracted"
        );

        if !ctx.is_stopped() {
            sink.emit(ctx.listing_batch(&results));
        }
        Ok(results)
    }

    fn rule(&self) -> &Arc<CompiledRule> {
        &self.ctx.rule
    }

    fn fetcher(&self) -> &Arc<dyn HttpFetcher> {
        &self.ctx.fetcher
    }
}

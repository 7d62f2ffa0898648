//! Crawling decorator: wraps any listing performer and runs phase two.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::{debug, warn};

use crate::torrent;

use super::error::{CrawlError, PerformerError};
use super::types::{CrawlTarget, ResultSink, SearchResult, SearchToken};
use super::{ListingPerformer, SearchPerformer};

/// Wraps a listing performer and crawls its crawlable results.
///
/// Detail fetches for one listing batch run concurrently, bounded by the
/// rule's `max_crawls`; each successful crawl is emitted as its own
/// batch, always after the listing batch that produced its source entry.
/// Crawl batches carry no ordering guarantee relative to each other.
pub struct CrawlingPerformer<L> {
    inner: L,
}

impl<L: ListingPerformer> CrawlingPerformer<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }

    /// Fetch one crawl target and extract final results from it.
    ///
    /// A payload that already is a terminal descriptor bypasses the
    /// detail pattern and goes straight to descriptor extraction.
    async fn crawl_one(&self, result: &SearchResult) -> Result<Vec<SearchResult>, CrawlError> {
        let Some(target) = &result.crawl_target else {
            return Ok(Vec::new());
        };

        let bytes = self
            .inner
            .fetcher()
            .fetch(target.url(), self.inner.timeout())
            .await?;

        let is_descriptor = matches!(target, CrawlTarget::TorrentDescriptor(_))
            || torrent::looks_like_descriptor(&bytes);
        if is_descriptor {
            return Ok(torrent::descriptor_results(result, &bytes)?);
        }

        let html = String::from_utf8_lossy(&bytes);
        Ok(self
            .inner
            .rule()
            .extract_detail(result, &html)
            .into_iter()
            .collect())
    }
}

#[async_trait]
impl<L: ListingPerformer> SearchPerformer for CrawlingPerformer<L> {
    fn token(&self) -> SearchToken {
        self.inner.token()
    }

    fn keywords(&self) -> &str {
        self.inner.keywords()
    }

    fn timeout(&self) -> Duration {
        self.inner.timeout()
    }

    fn stop(&self) {
        self.inner.stop();
    }

    fn is_stopped(&self) -> bool {
        self.inner.is_stopped()
    }

    async fn perform(&self, sink: &ResultSink) -> Result<(), PerformerError> {
        let preliminary = self.inner.run_listing(sink).await?;
        if self.is_stopped() {
            return Ok(());
        }

        let max_crawls = self.inner.rule().rule().max_crawls;
        let crawlable: Vec<SearchResult> = preliminary
            .into_iter()
            .filter(SearchResult::is_crawlable)
            .take(max_crawls)
            .collect();
        if crawlable.is_empty() {
            return Ok(());
        }

        debug!(
            source = %self.inner.rule().name(),
            count = crawlable.len(),
            "Crawling detail targets"
        );

        let mut crawls = stream::iter(crawlable)
            .map(|result| async move {
                if self.is_stopped() {
                    return None;
                }
                match self.crawl_one(&result).await {
                    Ok(results) => Some(results),
                    Err(e) => {
                        warn!(
                            source = %result.source,
                            url = %result.crawl_target.as_ref().map(CrawlTarget::url).unwrap_or_default(),
                            error = %e,
                            "Crawl failed, skipping item"
                        );
                        None
                    }
                }
            })
            .buffer_unordered(max_crawls);

        while let Some(outcome) = crawls.next().await {
            if self.is_stopped() {
                break;
            }
            if let Some(batch) = outcome {
                sink.emit(batch);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::HttpFetcher;
    use crate::performer::PagedListingPerformer;
    use crate::rule::CompiledRule;
    use crate::testing::{fixtures, MockFetcher};
    use std::sync::Arc;

    fn crawler(
        fetcher: Arc<MockFetcher>,
        rule: crate::rule::SearchRule,
    ) -> CrawlingPerformer<PagedListingPerformer> {
        let rule = Arc::new(CompiledRule::compile(rule).unwrap());
        CrawlingPerformer::new(PagedListingPerformer::new(
            9,
            "big buck",
            Duration::from_secs(1),
            fetcher,
            rule,
            None,
        ))
    }

    async fn run(performer: &CrawlingPerformer<PagedListingPerformer>) -> Vec<Vec<SearchResult>> {
        let (sink, mut rx) = ResultSink::channel();
        performer.perform(&sink).await.unwrap();
        drop(sink);

        let mut batches = Vec::new();
        while let Some(batch) = rx.recv().await {
            batches.push(batch);
        }
        batches
    }

    async fn seed_listing(fetcher: &MockFetcher, titles: &[&str]) {
        fetcher
            .respond(
                "https://example.com/search/big%20buck/1",
                fixtures::listing_page(titles).into_bytes(),
            )
            .await;
        fetcher
            .respond(
                "https://example.com/search/big%20buck/2",
                b"<html>empty</html>".to_vec(),
            )
            .await;
    }

    #[tokio::test]
    async fn test_crawl_enriches_each_result() {
        let fetcher = Arc::new(MockFetcher::new());
        seed_listing(&fetcher, &["alpha", "beta"]).await;
        fetcher
            .respond(
                "https://example.com/detail/alpha",
                fixtures::detail_page("magnet:?xt=urn:btih:aaa").into_bytes(),
            )
            .await;
        fetcher
            .respond(
                "https://example.com/detail/beta",
                fixtures::detail_page("magnet:?xt=urn:btih:bbb").into_bytes(),
            )
            .await;

        let performer = crawler(fetcher, fixtures::crawl_rule());
        let batches = run(&performer).await;

        // Crawlable results are withheld from the listing batch, then
        // each successful crawl arrives as its own batch.
        assert_eq!(batches.len(), 2);
        let mut magnets: Vec<String> = batches
            .iter()
            .flatten()
            .map(|r| r.torrent_url.clone().unwrap())
            .collect();
        magnets.sort();
        assert_eq!(magnets, vec!["magnet:?xt=urn:btih:aaa", "magnet:?xt=urn:btih:bbb"]);
        assert!(batches.iter().flatten().all(|r| r.crawl_target.is_none()));
    }

    #[tokio::test]
    async fn test_one_failed_detail_fetch_skips_only_that_item() {
        let fetcher = Arc::new(MockFetcher::new());
        seed_listing(&fetcher, &["alpha", "beta", "gamma"]).await;
        fetcher
            .respond(
                "https://example.com/detail/alpha",
                fixtures::detail_page("magnet:?xt=urn:btih:aaa").into_bytes(),
            )
            .await;
        // beta's detail page has no scripted response and fails.
        fetcher
            .respond(
                "https://example.com/detail/gamma",
                fixtures::detail_page("magnet:?xt=urn:btih:ccc").into_bytes(),
            )
            .await;

        let performer = crawler(fetcher, fixtures::crawl_rule());
        let batches = run(&performer).await;

        let finals: Vec<&SearchResult> = batches.iter().flatten().collect();
        assert_eq!(finals.len(), 2);
        assert!(finals.iter().all(|r| r.display_name != "beta"));
    }

    #[tokio::test]
    async fn test_unparseable_descriptor_is_skipped() {
        let fetcher = Arc::new(MockFetcher::new());
        seed_listing(&fetcher, &["alpha", "beta"]).await;
        fetcher
            .respond(
                "https://example.com/detail/alpha",
                // Bencode-looking payload that fails descriptor parsing.
                b"d8:announce3:abce".to_vec(),
            )
            .await;
        fetcher
            .respond(
                "https://example.com/detail/beta",
                fixtures::detail_page("magnet:?xt=urn:btih:bbb").into_bytes(),
            )
            .await;

        let performer = crawler(fetcher, fixtures::crawl_rule());
        let batches = run(&performer).await;

        let finals: Vec<&SearchResult> = batches.iter().flatten().collect();
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].display_name, "beta");
    }

    #[tokio::test]
    async fn test_crawl_fanout_respects_max_crawls() {
        let mut rule = fixtures::crawl_rule();
        rule.max_crawls = 2;

        let fetcher = Arc::new(MockFetcher::new());
        seed_listing(&fetcher, &["a", "b", "c", "d"]).await;
        for name in ["a", "b"] {
            fetcher
                .respond(
                    &format!("https://example.com/detail/{name}"),
                    fixtures::detail_page("magnet:?xt=urn:btih:xyz").into_bytes(),
                )
                .await;
        }

        let performer = crawler(fetcher.clone(), rule);
        let batches = run(&performer).await;

        // Only the first two crawlable entries were dispatched.
        assert_eq!(batches.iter().flatten().count(), 2);
        assert_eq!(fetcher.requests().await.len(), 4); // 2 pages + 2 crawls
    }

    #[tokio::test]
    async fn test_emit_preliminary_surfaces_listing_batch_too() {
        let mut rule = fixtures::crawl_rule();
        rule.emit_preliminary = true;

        let fetcher = Arc::new(MockFetcher::new());
        seed_listing(&fetcher, &["alpha"]).await;
        fetcher
            .respond(
                "https://example.com/detail/alpha",
                fixtures::detail_page("magnet:?xt=urn:btih:aaa").into_bytes(),
            )
            .await;

        let performer = crawler(fetcher, rule);
        let batches = run(&performer).await;

        assert_eq!(batches.len(), 2);
        // Listing batch first, preliminary form.
        assert!(batches[0][0].is_crawlable());
        assert!(batches[1][0].torrent_url.is_some());
    }

    #[tokio::test]
    async fn test_stop_before_perform_produces_nothing() {
        let fetcher = Arc::new(MockFetcher::new());
        let performer = crawler(fetcher.clone(), fixtures::crawl_rule());
        performer.stop();

        let batches = run(&performer).await;
        assert!(batches.is_empty());
        assert!(fetcher.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_descriptor_target_bypasses_detail_pattern() {
        // Listing pattern captures a torrent group, so the crawl target
        // is a descriptor locator even though the payload is garbage.
        let mut rule = fixtures::crawl_rule();
        rule.listing_pattern = concat!(
            "<a href=\"(?<url>[^\"]+)\" data-torrent=\"(?<torrent>[^\"]+)\">",
            "(?<title>[^<]+)</a>"
        )
        .to_string();
        rule.detail_pattern = None;

        let fetcher = Arc::new(MockFetcher::new());
        fetcher
            .respond(
                "https://example.com/search/big%20buck/1",
                concat!(
                    "<a href=\"/detail/alpha\" data-torrent=\"/dl/alpha.torrent\">alpha</a>"
                )
                .as_bytes()
                .to_vec(),
            )
            .await;
        fetcher
            .respond(
                "https://example.com/search/big%20buck/2",
                b"<html>empty</html>".to_vec(),
            )
            .await;
        fetcher
            .respond("https://example.com/dl/alpha.torrent", b"not bencode".to_vec())
            .await;

        let performer = crawler(fetcher.clone(), rule);
        let batches = run(&performer).await;

        // The descriptor fetch happened and its parse failure skipped the
        // item rather than falling back to the detail pattern.
        assert!(fetcher
            .requests()
            .await
            .contains(&"https://example.com/dl/alpha.torrent".to_string()));
        assert!(batches.is_empty());
    }
}

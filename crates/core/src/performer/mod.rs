//! Search performer hierarchy.
//!
//! A performer is one runnable search job bound to a caller token: it
//! fetches listing pages, applies its source's extraction rule, and
//! optionally crawls each entry's detail resource for a richer
//! representation. Variants compose instead of inheriting: the crawling
//! decorator wraps any listing strategy.

mod crawler;
mod error;
mod listing;
mod types;

pub use crawler::CrawlingPerformer;
pub use error::{CrawlError, PerformerError};
pub use listing::{PagedListingPerformer, SingleListingPerformer};
pub use types::{CrawlTarget, ResultSink, SearchResult, SearchToken, TorrentFile};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::fetcher::HttpFetcher;
use crate::rule::CompiledRule;

/// Capability set every performer exposes.
///
/// Results stream through the sink rather than a return value; batches
/// may reach listeners well before the job is finished. `perform` runs
/// once per performer: `CREATED → RUNNING → (STOPPED | COMPLETED)`.
#[async_trait]
pub trait SearchPerformer: Send + Sync {
    fn token(&self) -> SearchToken;

    fn keywords(&self) -> &str;

    /// Per-fetch timeout; a performer has no overall deadline.
    fn timeout(&self) -> Duration;

    /// Request cooperative cancellation. Idempotent, callable from any
    /// task; the flag is observed before each page fetch, each crawl
    /// dispatch and each emit, but in-flight fetches are never aborted.
    fn stop(&self);

    fn is_stopped(&self) -> bool;

    /// Run the job to completion, emitting result batches to `sink`.
    async fn perform(&self, sink: &ResultSink) -> Result<(), PerformerError>;
}

/// A performer whose listing phase can run on its own, so the crawling
/// decorator can compose over it.
#[async_trait]
pub trait ListingPerformer: SearchPerformer {
    /// Run the listing phase, emitting eligible batches to `sink`, and
    /// return every extracted result for a possible crawl phase.
    async fn run_listing(&self, sink: &ResultSink) -> Result<Vec<SearchResult>, PerformerError>;

    fn rule(&self) -> &Arc<CompiledRule>;

    fn fetcher(&self) -> &Arc<dyn HttpFetcher>;
}

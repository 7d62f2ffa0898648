use thiserror::Error;

use crate::fetcher::FetchError;
use crate::rule::RuleError;
use crate::torrent::TorrentParseError;

/// Fatal failure of one performer run. Anything recoverable (a failed
/// page fetch, a pattern that matched nothing, one broken crawl item)
/// is handled inside the run and never surfaces here.
#[derive(Debug, Error)]
pub enum PerformerError {
    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Failure of a single crawl item. Non-fatal: the item is skipped and
/// the rest of the batch proceeds.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Descriptor(#[from] TorrentParseError),
}

//! Result types and the channel performers stream them through.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Caller-supplied correlation id grouping all results and the
/// completion event of one logical query.
pub type SearchToken = u64;

/// Where phase two fetches the richer representation of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlTarget {
    /// An HTML detail page the detail pattern applies to.
    DetailPage(String),
    /// A torrent-descriptor locator; the payload is parsed directly,
    /// bypassing the detail pattern.
    TorrentDescriptor(String),
}

impl CrawlTarget {
    pub fn url(&self) -> &str {
        match self {
            CrawlTarget::DetailPage(url) => url,
            CrawlTarget::TorrentDescriptor(url) => url,
        }
    }
}

/// A file within a torrent descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentFile {
    /// Path within the torrent.
    pub path: String,
    /// Size in bytes.
    pub size_bytes: u64,
}

/// One found item. Immutable once produced by extraction; enrichment
/// builds a new record rather than mutating the preliminary one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Which source produced this result.
    pub source: String,
    /// Display name as extracted from the page.
    pub display_name: String,
    /// Link to the result's own page on the source.
    pub details_url: String,
    /// Size in bytes, when the source lists one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Seeder count, when the source lists one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeders: Option<u32>,
    /// Download descriptor reference recovered by the crawl phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrent_url: Option<String>,
    /// Info hash (lowercase hex) from a parsed descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    /// File listing from a parsed descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<TorrentFile>>,
    /// Set while this result still has a pending phase-two fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crawl_target: Option<CrawlTarget>,
}

impl SearchResult {
    /// Whether this result carries a crawl target for phase two.
    pub fn is_crawlable(&self) -> bool {
        self.crawl_target.is_some()
    }
}

/// Sending half of a performer's result stream. Batches flow to the
/// manager task that fans them out to listeners; results may arrive
/// before the performer is finished.
#[derive(Clone)]
pub struct ResultSink {
    tx: mpsc::UnboundedSender<Vec<SearchResult>>,
}

impl ResultSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Vec<SearchResult>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit one batch. Empty batches are dropped; a closed receiver is
    /// ignored since the run is already being torn down.
    pub fn emit(&self, batch: Vec<SearchResult>) {
        if batch.is_empty() {
            return;
        }
        let _ = self.tx.send(batch);
    }
}

//! Mock implementations and fixtures for tests.
//!
//! Every external seam of the pipeline has a mock here: the fetch
//! primitive, the domain probe, and the manager listener. Tests drive
//! full searches against scripted pages without touching the network.

mod collecting_listener;
mod mock_fetcher;
mod mock_probe;

pub use collecting_listener::{CollectingListener, Event};
pub use mock_fetcher::MockFetcher;
pub use mock_probe::MockProbe;

/// Shared rule and page fixtures.
pub mod fixtures {
    use crate::performer::SearchResult;
    use crate::rule::SearchRule;

    /// Listing pattern matching the rows `listing_page` generates.
    pub const LISTING_PATTERN: &str = concat!(
        "<a href=\"(?<url>[^\"]+)\">(?<title>[^<]+)</a>",
        "\\s*<td>(?<size>[^<]+)</td>\\s*<td>(?<seeds>\\d+)</td>"
    );

    /// Detail pattern matching the page `detail_page` generates.
    pub const DETAIL_PATTERN: &str = "href=\"(?<torrent>magnet:[^\"]+)\"";

    /// A paged rule with crawling disabled.
    pub fn plain_rule() -> SearchRule {
        SearchRule {
            name: "testsource".to_string(),
            default_domain: "example.com".to_string(),
            aliases: vec![],
            listing_url: "https://{domain}/search/{keywords}/{page}".to_string(),
            listing_pattern: LISTING_PATTERN.to_string(),
            detail_pattern: None,
            paged: true,
            max_pages: 3,
            max_results_per_page: 20,
            max_results: 60,
            max_crawls: 0,
            emit_preliminary: false,
        }
    }

    /// A paged rule with a detail pattern and crawling enabled.
    pub fn crawl_rule() -> SearchRule {
        SearchRule {
            detail_pattern: Some(DETAIL_PATTERN.to_string()),
            max_crawls: 5,
            ..plain_rule()
        }
    }

    /// A listing page with one row per title.
    pub fn listing_page(titles: &[&str]) -> String {
        titles
            .iter()
            .map(|t| format!("<a href=\"/detail/{t}\">{t}</a> <td>1 GB</td> <td>5</td>"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// A detail page carrying one magnet link.
    pub fn detail_page(magnet: &str) -> String {
        format!("<html><a href=\"{magnet}\">download</a></html>")
    }

    /// A plain, non-crawlable result with reasonable defaults.
    pub fn search_result(name: &str) -> SearchResult {
        SearchResult {
            source: "testsource".to_string(),
            display_name: name.to_string(),
            details_url: format!("https://example.com/detail/{name}"),
            size_bytes: Some(1024 * 1024),
            seeders: Some(5),
            torrent_url: None,
            info_hash: None,
            files: None,
            crawl_target: None,
        }
    }
}

//! Compiled, validated form of a search rule.

use regex_lite::{Captures, Regex};
use thiserror::Error;
use tracing::error;

use crate::performer::{CrawlTarget, SearchResult};

use super::types::SearchRule;

/// Rule validation/compilation failures. These are configuration errors:
/// fatal for the token using the rule, invisible to every other token.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid {which} pattern for source {source_name}: {message}")]
    BadPattern {
        source_name: String,
        which: &'static str,
        message: String,
    },

    #[error("listing pattern for source {0} has no `title` capture group")]
    MissingTitleGroup(String),

    #[error("listing URL template for source {0} is missing the {{keywords}} placeholder")]
    MissingKeywordsPlaceholder(String),

    #[error("paged source {0} is missing the {{page}} placeholder in its listing URL")]
    MissingPagePlaceholder(String),

    #[error("source {0} enables crawling but has neither a detail pattern nor a `torrent` capture group")]
    NoCrawlSupport(String),
}

/// A `SearchRule` with its patterns compiled and its template checked.
#[derive(Debug)]
pub struct CompiledRule {
    rule: SearchRule,
    listing: Regex,
    detail: Option<Regex>,
}

impl CompiledRule {
    pub fn compile(rule: SearchRule) -> Result<Self, RuleError> {
        let listing = Regex::new(&rule.listing_pattern).map_err(|e| RuleError::BadPattern {
            source_name: rule.name.clone(),
            which: "listing",
            message: e.to_string(),
        })?;

        if !listing.capture_names().any(|n| n == Some("title")) {
            return Err(RuleError::MissingTitleGroup(rule.name.clone()));
        }
        if !rule.listing_url.contains("{keywords}") {
            return Err(RuleError::MissingKeywordsPlaceholder(rule.name.clone()));
        }
        if rule.paged && !rule.listing_url.contains("{page}") {
            return Err(RuleError::MissingPagePlaceholder(rule.name.clone()));
        }

        let detail = match &rule.detail_pattern {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| RuleError::BadPattern {
                source_name: rule.name.clone(),
                which: "detail",
                message: e.to_string(),
            })?),
            None => None,
        };

        let has_torrent_group = listing.capture_names().any(|n| n == Some("torrent"));
        if rule.max_crawls > 0 && detail.is_none() && !has_torrent_group {
            return Err(RuleError::NoCrawlSupport(rule.name.clone()));
        }

        Ok(Self {
            rule,
            listing,
            detail,
        })
    }

    pub fn rule(&self) -> &SearchRule {
        &self.rule
    }

    pub fn name(&self) -> &str {
        &self.rule.name
    }

    pub fn default_domain(&self) -> &str {
        &self.rule.default_domain
    }

    /// Substitute domain, page and keywords into the listing URL template.
    pub fn listing_page_url(&self, domain: &str, page: u32, encoded_keywords: &str) -> String {
        self.rule
            .listing_url
            .replace("{domain}", domain)
            .replace("{page}", &page.to_string())
            .replace("{keywords}", encoded_keywords)
    }

    /// Apply the listing pattern to a fetched page, in document order,
    /// taking at most `limit` matches.
    pub fn extract_listing(&self, html: &str, domain: &str, limit: usize) -> Vec<SearchResult> {
        self.listing
            .captures_iter(html)
            .take(limit)
            .filter_map(|caps| self.result_from_captures(&caps, domain))
            .collect()
    }

    /// Apply the detail pattern to a crawled page, folding any captured
    /// fields into the preliminary result. `None` when the pattern finds
    /// nothing, which usually means the source changed its markup.
    pub fn extract_detail(&self, base: &SearchResult, html: &str) -> Option<SearchResult> {
        let detail = self.detail.as_ref()?;
        let caps = match detail.captures(html) {
            Some(caps) => caps,
            None => {
                error!(
                    source = %self.rule.name,
                    details_url = %base.details_url,
                    "Detail pattern found no match, source markup may have changed"
                );
                return None;
            }
        };

        let mut result = base.clone();
        result.crawl_target = None;
        if let Some(title) = named(&caps, "title") {
            result.display_name = title.to_string();
        }
        if let Some(size) = named(&caps, "size").and_then(parse_size) {
            result.size_bytes = Some(size);
        }
        if let Some(seeds) = named(&caps, "seeds").and_then(parse_count) {
            result.seeders = Some(seeds);
        }
        if let Some(torrent) = named(&caps, "torrent") {
            result.torrent_url = Some(absolutize(&self.rule.default_domain, torrent));
        }
        Some(result)
    }

    fn result_from_captures(&self, caps: &Captures<'_>, domain: &str) -> Option<SearchResult> {
        let title = named(caps, "title")?.trim();
        if title.is_empty() {
            return None;
        }

        let details_url = named(caps, "url")
            .map(|u| absolutize(domain, u))
            .unwrap_or_else(|| format!("https://{}/", domain));

        let crawl_target = if self.rule.max_crawls == 0 {
            None
        } else if let Some(torrent) = named(caps, "torrent") {
            Some(CrawlTarget::TorrentDescriptor(absolutize(domain, torrent)))
        } else if self.detail.is_some() && named(caps, "url").is_some() {
            Some(CrawlTarget::DetailPage(details_url.clone()))
        } else {
            None
        };

        Some(SearchResult {
            source: self.rule.name.clone(),
            display_name: title.to_string(),
            details_url,
            size_bytes: named(caps, "size").and_then(parse_size),
            seeders: named(caps, "seeds").and_then(parse_count),
            torrent_url: None,
            info_hash: None,
            files: None,
            crawl_target,
        })
    }
}

fn named<'t>(caps: &Captures<'t>, group: &str) -> Option<&'t str> {
    caps.name(group).map(|m| m.as_str())
}

/// Prefix relative references with the domain; scheme-qualified ones
/// (http, magnet, ...) pass through untouched.
fn absolutize(domain: &str, reference: &str) -> String {
    if reference.contains("://") || reference.starts_with("magnet:") {
        return reference.to_string();
    }
    if let Some(path) = reference.strip_prefix('/') {
        return format!("https://{}/{}", domain, path);
    }
    format!("https://{}/{}", domain, reference)
}

/// Parse a human-readable size like "1.4 GB" or "700MB" into bytes.
pub fn parse_size(text: &str) -> Option<u64> {
    let text = text.trim().replace(',', "");
    let split = text
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let value: f64 = number.trim().parse().ok()?;

    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" | "KIB" => 1024,
        "MB" | "MIB" => 1024 * 1024,
        "GB" | "GIB" => 1024 * 1024 * 1024,
        "TB" | "TIB" => 1024u64.pow(4),
        _ => return None,
    };

    if value < 0.0 {
        return None;
    }
    Some((value * multiplier as f64) as u64)
}

fn parse_count(text: &str) -> Option<u32> {
    text.trim().replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_rule() -> SearchRule {
        SearchRule {
            name: "testsource".to_string(),
            default_domain: "example.com".to_string(),
            aliases: vec![],
            listing_url: "https://{domain}/search/{keywords}/{page}".to_string(),
            listing_pattern: concat!(
                "<a href=\"(?<url>[^\"]+)\">(?<title>[^<]+)</a>",
                "\\s*<td>(?<size>[^<]+)</td>\\s*<td>(?<seeds>\\d+)</td>"
            )
            .to_string(),
            detail_pattern: Some("href=\"(?<torrent>magnet:[^\"]+)\"".to_string()),
            paged: true,
            max_pages: 2,
            max_results_per_page: 10,
            max_results: 20,
            max_crawls: 5,
            emit_preliminary: false,
        }
    }

    fn listing_row(title: &str, size: &str, seeds: u32) -> String {
        format!(
            "<a href=\"/detail/{title}\">{title}</a> <td>{size}</td> <td>{seeds}</td>"
        )
    }

    #[test]
    fn test_compile_valid_rule() {
        assert!(CompiledRule::compile(base_rule()).is_ok());
    }

    #[test]
    fn test_compile_rejects_bad_listing_pattern() {
        let mut rule = base_rule();
        rule.listing_pattern = "(?<title>unclosed".to_string();
        let err = CompiledRule::compile(rule).unwrap_err();
        assert!(matches!(err, RuleError::BadPattern { which: "listing", .. }));
    }

    #[test]
    fn test_compile_requires_title_group() {
        let mut rule = base_rule();
        rule.listing_pattern = "<a>(?<url>[^<]+)</a>".to_string();
        let err = CompiledRule::compile(rule).unwrap_err();
        assert!(matches!(err, RuleError::MissingTitleGroup(_)));
    }

    #[test]
    fn test_compile_requires_page_placeholder_when_paged() {
        let mut rule = base_rule();
        rule.listing_url = "https://{domain}/search/{keywords}".to_string();
        let err = CompiledRule::compile(rule).unwrap_err();
        assert!(matches!(err, RuleError::MissingPagePlaceholder(_)));
    }

    #[test]
    fn test_compile_requires_keywords_placeholder() {
        let mut rule = base_rule();
        rule.listing_url = "https://{domain}/latest/{page}".to_string();
        let err = CompiledRule::compile(rule).unwrap_err();
        assert!(matches!(err, RuleError::MissingKeywordsPlaceholder(_)));
    }

    #[test]
    fn test_compile_requires_crawl_support_when_crawling() {
        let mut rule = base_rule();
        rule.detail_pattern = None;
        let err = CompiledRule::compile(rule).unwrap_err();
        assert!(matches!(err, RuleError::NoCrawlSupport(_)));

        // Crawling disabled: the same rule is fine.
        let mut rule = base_rule();
        rule.detail_pattern = None;
        rule.max_crawls = 0;
        assert!(CompiledRule::compile(rule).is_ok());
    }

    #[test]
    fn test_listing_page_url_substitution() {
        let rule = CompiledRule::compile(base_rule()).unwrap();
        assert_eq!(
            rule.listing_page_url("m1.example.com", 2, "big%20buck"),
            "https://m1.example.com/search/big%20buck/2"
        );
    }

    #[test]
    fn test_extract_listing_maps_named_groups() {
        let rule = CompiledRule::compile(base_rule()).unwrap();
        let html = format!(
            "{}\n{}",
            listing_row("alpha", "1.5 GB", 12),
            listing_row("beta", "700 MB", 3)
        );

        let results = rule.extract_listing(&html, "example.com", 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].display_name, "alpha");
        assert_eq!(results[0].details_url, "https://example.com/detail/alpha");
        assert_eq!(results[0].size_bytes, Some((1.5 * 1024.0 * 1024.0 * 1024.0) as u64));
        assert_eq!(results[0].seeders, Some(12));
        assert_eq!(
            results[0].crawl_target,
            Some(CrawlTarget::DetailPage(
                "https://example.com/detail/alpha".to_string()
            ))
        );
        assert_eq!(results[1].display_name, "beta");
    }

    #[test]
    fn test_extract_listing_respects_limit() {
        let rule = CompiledRule::compile(base_rule()).unwrap();
        let html: Vec<String> = (0..5).map(|i| listing_row(&format!("r{i}"), "1 MB", i)).collect();
        let results = rule.extract_listing(&html.join("\n"), "example.com", 2);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_extract_listing_no_matches() {
        let rule = CompiledRule::compile(base_rule()).unwrap();
        assert!(rule.extract_listing("<html>nothing here</html>", "example.com", 10).is_empty());
    }

    #[test]
    fn test_no_crawl_target_when_crawling_disabled() {
        let mut raw = base_rule();
        raw.max_crawls = 0;
        raw.detail_pattern = None;
        let rule = CompiledRule::compile(raw).unwrap();

        let results = rule.extract_listing(&listing_row("alpha", "1 GB", 1), "example.com", 10);
        assert_eq!(results[0].crawl_target, None);
    }

    #[test]
    fn test_extract_detail_enriches_result() {
        let rule = CompiledRule::compile(base_rule()).unwrap();
        let base = rule
            .extract_listing(&listing_row("alpha", "1 GB", 1), "example.com", 10)
            .remove(0);

        let detail_html = "<a href=\"magnet:?xt=urn:btih:abc123\">download</a>";
        let enriched = rule.extract_detail(&base, detail_html).unwrap();
        assert_eq!(
            enriched.torrent_url.as_deref(),
            Some("magnet:?xt=urn:btih:abc123")
        );
        assert_eq!(enriched.display_name, "alpha");
        assert!(enriched.crawl_target.is_none());
    }

    #[test]
    fn test_extract_detail_none_on_mismatch() {
        let rule = CompiledRule::compile(base_rule()).unwrap();
        let base = rule
            .extract_listing(&listing_row("alpha", "1 GB", 1), "example.com", 10)
            .remove(0);
        assert!(rule.extract_detail(&base, "<html>changed markup</html>").is_none());
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize("example.com", "/detail/1"),
            "https://example.com/detail/1"
        );
        assert_eq!(
            absolutize("example.com", "detail/1"),
            "https://example.com/detail/1"
        );
        assert_eq!(
            absolutize("example.com", "http://other.org/x"),
            "http://other.org/x"
        );
        assert_eq!(
            absolutize("example.com", "magnet:?xt=urn:btih:abc"),
            "magnet:?xt=urn:btih:abc"
        );
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("700 MB"), Some(700 * 1024 * 1024));
        assert_eq!(parse_size("1.5GB"), Some((1.5 * 1024.0 * 1024.0 * 1024.0) as u64));
        assert_eq!(parse_size("2 KiB"), Some(2048));
        assert_eq!(parse_size("1,024 B"), Some(1024));
        assert_eq!(parse_size("512"), Some(512));
        assert_eq!(parse_size("lots"), None);
        assert_eq!(parse_size("3 parsecs"), None);
    }
}

//! Rule configuration as it appears in the config file.

use serde::{Deserialize, Serialize};

/// Extraction rule for one search source.
///
/// The listing URL is a template with `{domain}`, `{page}` and
/// `{keywords}` placeholders. Patterns use named capture groups to map
/// matches onto result fields: `title` (required), `url`, `torrent`,
/// `size` and `seeds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRule {
    /// Source name, unique across the configuration.
    pub name: String,
    /// Canonical domain for this source.
    pub default_domain: String,
    /// Known mirror hostnames, fed to the alias manager at startup.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Listing page URL template.
    pub listing_url: String,
    /// Pattern applied to listing pages.
    pub listing_pattern: String,
    /// Pattern applied to detail pages during the crawl phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_pattern: Option<String>,
    /// Whether the source paginates; single-page sources have no
    /// `{page}` placeholder.
    #[serde(default = "default_paged")]
    pub paged: bool,
    /// Maximum listing pages to walk.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Cap on matches taken from a single listing page.
    #[serde(default = "default_max_results_per_page")]
    pub max_results_per_page: usize,
    /// Overall cap on listing results for one run.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Bound on concurrent detail fetches; zero disables crawling.
    #[serde(default = "default_max_crawls")]
    pub max_crawls: usize,
    /// Emit crawlable results in the listing batch instead of holding
    /// them back until their crawl succeeds.
    #[serde(default)]
    pub emit_preliminary: bool,
}

fn default_paged() -> bool {
    true
}

fn default_max_pages() -> u32 {
    3
}

fn default_max_results_per_page() -> usize {
    20
}

fn default_max_results() -> usize {
    60
}

fn default_max_crawls() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_defaults_from_minimal_toml() {
        let toml = r#"
name = "tpb"
default_domain = "thepiratebay.se"
listing_url = "https://{domain}/search/{keywords}/{page}/7/0"
listing_pattern = "<a>(?<title>.*?)</a>"
"#;
        let rule: SearchRule = toml::from_str(toml).unwrap();
        assert!(rule.paged);
        assert_eq!(rule.max_pages, 3);
        assert_eq!(rule.max_results_per_page, 20);
        assert_eq!(rule.max_results, 60);
        assert_eq!(rule.max_crawls, 10);
        assert!(!rule.emit_preliminary);
        assert!(rule.aliases.is_empty());
        assert!(rule.detail_pattern.is_none());
    }

    #[test]
    fn test_rule_serialization_round_trip() {
        let toml = r#"
name = "monova"
default_domain = "monova.org"
aliases = ["m1.monova.org"]
listing_url = "https://{domain}/search?term={keywords}&page={page}"
listing_pattern = "<a>(?<title>.*?)</a>"
detail_pattern = "magnet:(?<torrent>[^\"]+)"
max_pages = 2
max_crawls = 5
"#;
        let rule: SearchRule = toml::from_str(toml).unwrap();
        let json = serde_json::to_string(&rule).unwrap();
        let parsed: SearchRule = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name, "monova");
        assert_eq!(parsed.max_pages, 2);
        assert_eq!(parsed.aliases, vec!["m1.monova.org"]);
    }
}

//! Federated content-search engine.
//!
//! Queries fan out to configured sources, each a scraping rule bound to
//! a default domain and a set of mirror aliases. Results stream back to
//! listeners in batches as each source produces them; sources that crawl
//! fetch a detail resource per listing entry before emitting. Mirror
//! failover is handled per source by a [`domain::DomainAliasManager`].

pub mod config;
pub mod domain;
pub mod fetcher;
pub mod manager;
pub mod performer;
pub mod rule;
pub mod source;
pub mod testing;
pub mod torrent;

pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError, EngineConfig};
pub use domain::{DomainAlias, DomainAliasManager, DomainAliasState, DomainProbe, HttpProbe};
pub use fetcher::{FetchError, HttpFetcher, ReqwestFetcher};
pub use manager::{SearchListener, SearchManager, SearchManagerError};
pub use performer::{
    CrawlTarget, PerformerError, ResultSink, SearchPerformer, SearchResult, SearchToken,
    TorrentFile,
};
pub use rule::{CompiledRule, RuleError, SearchRule};
pub use source::SourceRegistry;

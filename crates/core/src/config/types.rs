use serde::{Deserialize, Serialize};

use crate::rule::SearchRule;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    /// One entry per search source.
    #[serde(default, rename = "source")]
    pub sources: Vec<SearchRule>,
}

/// Engine-wide settings shared by every source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// User agent sent with every fetch.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-fetch timeout in seconds. There is no per-search deadline.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Timeout for domain health probes in seconds.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

fn default_user_agent() -> String {
    "driftnet/0.1".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_probe_timeout_secs() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let engine = EngineConfig::default();
        assert_eq!(engine.user_agent, "driftnet/0.1");
        assert_eq!(engine.fetch_timeout_secs, 10);
        assert_eq!(engine.probe_timeout_secs, 5);
    }

    #[test]
    fn test_empty_config_parses() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.sources.is_empty());
        assert_eq!(config.engine.fetch_timeout_secs, 10);
    }
}

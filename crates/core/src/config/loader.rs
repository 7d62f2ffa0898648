use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("DRIFTNET_").split("_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[engine]
fetch_timeout_secs = 20

[[source]]
name = "tpb"
default_domain = "thepiratebay.se"
aliases = ["m1.thepiratebay.se"]
listing_url = "https://{domain}/search/{keywords}/{page}/7/0"
listing_pattern = "<a>(?<title>.*?)</a>"
max_crawls = 0
"#;

    #[test]
    fn test_load_config_from_str_valid() {
        let config = load_config_from_str(SAMPLE).unwrap();
        assert_eq!(config.engine.fetch_timeout_secs, 20);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].name, "tpb");
        assert_eq!(config.sources[0].aliases, vec!["m1.thepiratebay.se"]);
    }

    #[test]
    fn test_load_config_from_str_missing_required_field() {
        let toml = r#"
[[source]]
name = "broken"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{SAMPLE}").unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.engine.fetch_timeout_secs, 20);
        assert_eq!(config.sources.len(), 1);
    }
}

use std::collections::HashSet;

use crate::rule::CompiledRule;

use super::{types::Config, ConfigError};

/// Validate a parsed configuration before the engine is built from it.
///
/// Source names must be unique and every rule must compile; a rule that
/// fails here would otherwise surface as a fatal per-token error at
/// dispatch time.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.engine.fetch_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "fetch_timeout_secs must be greater than zero".to_string(),
        ));
    }

    let mut names: HashSet<&str> = HashSet::new();
    for source in &config.sources {
        if !names.insert(&source.name) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate source name: {}",
                source.name
            )));
        }
        if source.default_domain.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "source {} has an empty default_domain",
                source.name
            )));
        }
        CompiledRule::compile(source.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    }

    Ok(())
}

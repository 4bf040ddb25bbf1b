//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::StasisConfig;
use std::path::Path;

/// Name of the configuration file looked up in a directory.
pub const CONFIG_FILE: &str = "stasis.toml";

/// Loads and validates `<dir>/stasis.toml`.
pub fn load_config(dir: &Path) -> Result<StasisConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<StasisConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `stasis.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<StasisConfig, ConfigError> {
    let config: StasisConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks that cache paths are usable.
fn validate_config(config: &StasisConfig) -> Result<(), ConfigError> {
    if config.cache.dir.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "cache.dir must not be empty".to_string(),
        ));
    }
    if config.cache.dir.trim() != config.cache.dir {
        return Err(ConfigError::ValidationError(format!(
            "cache.dir must not have leading or trailing whitespace, got '{}'",
            config.cache.dir
        )));
    }
    let file = config.cache.file.as_str();
    if file.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "cache.file must not be empty".to_string(),
        ));
    }
    if file.trim() != file {
        return Err(ConfigError::ValidationError(format!(
            "cache.file must not have leading or trailing whitespace, got '{file}'"
        )));
    }
    if file.contains('/') || file.contains('\\') || file == "." || file == ".." {
        return Err(ConfigError::ValidationError(format!(
            "cache.file must be a plain file name, got '{file}'"
        )));
    }
    Ok(())
}

//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::SimConfig;
use std::io::ErrorKind;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "dsim.toml";

/// Loads and validates `<project_dir>/dsim.toml`.
pub fn load_config(project_dir: &Path) -> Result<SimConfig, ConfigError> {
    let content = std::fs::read_to_string(project_dir.join(CONFIG_FILE_NAME))?;
    load_config_from_str(&content)
}

/// Like [`load_config`], but a missing file yields the default configuration.
pub fn load_config_or_default(project_dir: &Path) -> Result<SimConfig, ConfigError> {
    match std::fs::read_to_string(project_dir.join(CONFIG_FILE_NAME)) {
        Ok(content) => load_config_from_str(&content),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(SimConfig::default()),
        Err(e) => Err(e.into()),
    }
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<SimConfig, ConfigError> {
    let config: SimConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &SimConfig) -> Result<(), ConfigError> {
    if config.run.max_deltas == 0 {
        return Err(ConfigError::ValidationError(
            "run.max_deltas must be at least 1".to_string(),
        ));
    }
    if config.run.max_activations == 0 {
        return Err(ConfigError::ValidationError(
            "run.max_activations must be at least 1".to_string(),
        ));
    }
    Ok(())
}

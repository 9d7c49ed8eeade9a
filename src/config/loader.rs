//! Configuration loading from TOML files.

use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: impl AsRef<Path>) -> Result<ProxyConfig, ConfigError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: ProxyConfig = toml::from_str(&contents)?;

    let errors = validate_config(&config);
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors));
    }

    tracing::info!(
        path = %path.as_ref().display(),
        routes = config.routes.len(),
        services = config.services.len(),
        "Configuration loaded"
    );
    Ok(config)
}

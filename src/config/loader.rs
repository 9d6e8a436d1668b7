//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{
    DocLedgerConfig, Secrets, PINATA_API_KEY_ENV_VAR, PINATA_SECRET_ENV_VAR, PRIVATE_KEY_ENV_VAR,
};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_PATH_ENV_VAR: &str = "DOCLEDGER_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Environment variable {0} not set")]
    MissingEnv(&'static str),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<DocLedgerConfig, ConfigError> {
    let config: DocLedgerConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<DocLedgerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load from `path`, falling back to `DOCLEDGER_CONFIG`, then to validated
/// defaults.
pub fn load_config_or_default(path: Option<&Path>) -> Result<DocLedgerConfig, ConfigError> {
    let from_env = std::env::var(CONFIG_PATH_ENV_VAR).ok();
    match path.map(Path::to_path_buf).or_else(|| from_env.map(Into::into)) {
        Some(path) => load_config(&path),
        None => {
            let config = DocLedgerConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingEnv(name))
}

/// Read signing and pinning credentials from the environment.
pub fn load_secrets() -> Result<Secrets, ConfigError> {
    Ok(Secrets {
        private_key: require_env(PRIVATE_KEY_ENV_VAR)?,
        pinata_api_key: require_env(PINATA_API_KEY_ENV_VAR)?,
        pinata_secret: require_env(PINATA_SECRET_ENV_VAR)?,
    })
}

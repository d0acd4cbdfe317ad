use thiserror::Error;

/// Errors that can occur during configuration loading
///
/// The core operations themselves never error for well-formed input: unknown
/// ids degrade to no-op or empty results by design. Errors only arise at the
/// configuration boundary.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

//! Error types for configuration loading and path resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the configuration layer.
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Configuration errors with actionable hints.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Configuration file not found: {0}\n\nHint: Create kiln.config.json or pass --config <path>"
    )]
    NotFound(PathBuf),

    #[error("Invalid configuration value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },

    #[error("Unknown path role: {role}\n\nHint: This is a bug in the caller, not in your configuration")]
    UnknownPathRole { role: &'static str },

    #[error(
        "Path role '{role}' resolves to an empty path\n\nHint: Check the 'paths' and 'dirs' sections of kiln.config.json"
    )]
    EmptyPathRole { role: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_mentions_config_file() {
        let err = ConfigError::NotFound(PathBuf::from("missing.json"));
        let msg = err.to_string();
        assert!(msg.contains("missing.json"));
        assert!(msg.contains("Hint:"));
    }

    #[test]
    fn empty_role_names_the_role() {
        let err = ConfigError::EmptyPathRole { role: "public" };
        assert!(err.to_string().contains("'public'"));
    }
}

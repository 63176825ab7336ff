//! Error types for the bundler adapter.

use std::path::PathBuf;

/// Errors produced while generating configuration, bundling, or writing output.
#[derive(Debug, thiserror::Error)]
pub enum BundlerError {
    /// Error reported by the Rolldown engine.
    #[error("Bundling failed: {0}")]
    Engine(String),

    /// Invalid adapter configuration.
    #[error("Invalid bundler configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// Output naming template that cannot produce a usable file name.
    #[error("Invalid naming template '{template}': {reason}")]
    InvalidNaming { template: String, reason: String },

    /// Globals or style-variables document could not be parsed.
    #[error("Failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// Path table lookup failure.
    #[error(transparent)]
    Config(#[from] kiln_config::ConfigError),
}

/// Result type alias for adapter operations.
pub type Result<T, E = BundlerError> = std::result::Result<T, E>;

impl BundlerError {
    /// Create an engine error from Rolldown's batched diagnostics.
    ///
    /// Rolldown reports failures as a batch of diagnostics without a stable
    /// error type across hooks, so the batch is captured through its debug
    /// representation.
    pub fn from_engine(error: &dyn std::fmt::Debug) -> Self {
        BundlerError::Engine(format!("{error:?}"))
    }
}

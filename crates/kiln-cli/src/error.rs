//! Error handling for the Kiln CLI.
//!
//! One top-level enum (`CliError`) wraps the configuration and bundler error
//! types plus everything the pipeline steps can fail with. Conversion from
//! domain errors is automatic via `#[from]`; `ResultExt` attaches path and
//! hint context at call sites. Rendering happens once, at the top of `main`,
//! through the `miette` submodule.

use std::path::PathBuf;

use thiserror::Error;

pub mod miette;

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration loading or path-table errors
    #[error("Configuration error: {0}")]
    Config(#[from] kiln_config::ConfigError),

    /// Errors from the bundler adapter
    #[error("Bundler error: {0}")]
    Bundler(#[from] kiln_bundler::BundlerError),

    /// A pipeline step failed; carries the step's name
    #[error("Build step '{step}' failed: {source}")]
    Pipeline {
        /// Name of the failing step
        step: &'static str,
        /// The underlying failure
        source: Box<CliError>,
    },

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Template rendering errors
    #[error("Template error: {0}\n\nHint: Check the template syntax in your templates directory")]
    Template(#[from] minijinja::Error),

    /// Image decoding or re-encoding errors
    #[error("Image processing failed for '{}': {error}", .path.display())]
    Image {
        /// The image that failed to process
        path: PathBuf,
        /// The underlying codec error
        error: image::ImageError,
    },

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Development server errors
    #[error("Server error: {0}")]
    Server(String),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Replace a not-found I/O error with [`CliError::FileNotFound`] naming `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a `Hint:` line to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message with `msg`.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{err}\n\nHint: {hint}"))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{msg}: {err}"))
        })
    }
}

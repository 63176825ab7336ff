//! Configuration layer for the kiln build orchestrator.
//!
//! Provides the configuration document (`KilnConfig`, loaded from defaults,
//! `kiln.config.json`, and `KILN_*` environment variables), the path table
//! mapping logical roles to concrete directories, the build mode, and the
//! immutable `BuildContext` handed to every pipeline step.

pub mod context;
mod defaults;
pub mod document;
pub mod error;
mod loading;
pub mod paths;

pub use context::{BuildContext, Mode};
pub use document::{
    BundlerSection, DirsSection, FilesSection, KilnConfig, LivereloadSettings, PathsSection,
    SettingsSection,
};
pub use error::{ConfigError, Result};
pub use paths::{PathRole, PathTable};

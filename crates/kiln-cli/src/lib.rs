//! Kiln CLI library.
//!
//! Sequences independent build transformations - asset bundling, template
//! rendering, reference injection, image compression, publishing - into the
//! production and development pipelines, and drives the development watch
//! loop with its live-reload server.
//!
//! The binary in `main.rs` is a thin wrapper; everything it does is exposed
//! here so integration tests can drive the same code paths.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod pipeline;
pub mod steps;
pub mod ui;
pub mod watch;

pub use error::{CliError, Result};
pub use pipeline::{Pipeline, Step};

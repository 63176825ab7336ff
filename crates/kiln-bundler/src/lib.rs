//! # kiln-bundler
//!
//! The bundler adapter: owns the Rolldown engine behind a small surface.
//! Translates the kiln configuration document into engine options (lazily
//! generated, cached per mode), runs one-shot or watch compilations, reports
//! lifecycle events over subscriber channels, and writes bundle output with
//! mode-dependent naming plus a manifest consumed by reference injection.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kiln_bundler::BundlerAdapter;
//! use kiln_config::{BuildContext, KilnConfig, Mode};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = BuildContext::new(Mode::Production, Arc::new(KilnConfig::default()));
//! let adapter = BundlerAdapter::new();
//! let manifest = adapter.run(&ctx).await?;
//! println!("script bundle: {}", manifest.script);
//! # Ok(()) }
//! ```

pub mod adapter;
pub mod error;
pub mod events;
pub mod generated;
pub mod manifest;
pub mod plugins;
pub mod variables;
pub mod writer;

pub use adapter::BundlerAdapter;
pub use error::{BundlerError, Result};
pub use events::{BundleEvent, EventHub};
pub use generated::GeneratedConfig;
pub use manifest::BundleManifest;
pub use variables::StyleVariables;

// Re-export core Rolldown types for plugin authors
pub use rolldown::{BundleOutput, BundlerBuilder, BundlerOptions, InputItem};
pub use rolldown_common::{ModuleType, Output};

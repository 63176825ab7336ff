//! Build mode and the immutable context handed to pipeline steps.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::KilnConfig;
use crate::error::Result;
use crate::paths::{PathRole, PathTable};

/// Build variant, fixed for the lifetime of one pipeline run.
///
/// Conditions minification, source maps, output naming, image compression,
/// and watch behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    pub fn is_production(self) -> bool {
        matches!(self, Mode::Production)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

/// Immutable state shared by every step of one pipeline run.
///
/// Steps receive `&BuildContext` and nothing else; there is no mutable
/// orchestrator state to leak between runs.
#[derive(Debug, Clone)]
pub struct BuildContext {
    mode: Mode,
    paths: PathTable,
    config: Arc<KilnConfig>,
}

impl BuildContext {
    pub fn new(mode: Mode, config: Arc<KilnConfig>) -> Self {
        let paths = PathTable::from_config(&config);
        Self {
            mode,
            paths,
            config,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn paths(&self) -> &PathTable {
        &self.paths
    }

    pub fn config(&self) -> &KilnConfig {
        &self.config
    }

    /// Shared handle to the configuration document.
    pub fn config_arc(&self) -> Arc<KilnConfig> {
        Arc::clone(&self.config)
    }

    /// Shorthand for `paths().get(role)`.
    pub fn path(&self, role: PathRole) -> Result<&Path> {
        self.paths.get(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_predicates() {
        assert!(Mode::Production.is_production());
        assert!(!Mode::Development.is_production());
        assert_eq!(Mode::Development.as_str(), "development");
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Mode::Production).unwrap(),
            "\"production\""
        );
    }

    #[test]
    fn context_exposes_resolved_paths() {
        let ctx = BuildContext::new(Mode::Development, Arc::new(KilnConfig::default()));
        assert_eq!(ctx.mode(), Mode::Development);
        assert!(ctx.path(PathRole::Temp).unwrap().ends_with("temp"));
    }

    #[test]
    fn clones_share_the_config() {
        let ctx = BuildContext::new(Mode::Production, Arc::new(KilnConfig::default()));
        let clone = ctx.clone();
        assert!(Arc::ptr_eq(&ctx.config_arc(), &clone.config_arc()));
    }
}

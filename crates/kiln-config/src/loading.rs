//! Multi-source configuration loading.

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};

use crate::document::KilnConfig;
use crate::error::{ConfigError, Result};

impl KilnConfig {
    /// Load configuration from multiple sources.
    /// Priority: environment variables > config file > defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        // Load kiln.config.json if present; an explicitly named file must exist.
        let config_file = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Some(path.to_path_buf())
            }
            None => {
                let default_path = Path::new("kiln.config.json");
                default_path.exists().then(|| default_path.to_path_buf())
            }
        };

        if let Some(path) = config_file {
            tracing::debug!(path = %path.display(), "loading configuration file");
            figment = figment.merge(Json::file(path));
        }

        // Merge environment variables (KILN_PATHS_ROOT, KILN_BUNDLER_REPORT, ...)
        figment = figment.merge(Env::prefixed("KILN_").split("_"));

        figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            value: e.to_string(),
            hint: "Check kiln.config.json syntax and field types".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiln.config.json");
        std::fs::write(
            &path,
            r#"{ "paths": { "results": "dist/" }, "bundler": { "report": true } }"#,
        )
        .unwrap();

        let config = KilnConfig::load(Some(&path)).unwrap();
        assert_eq!(config.paths.results, "dist/");
        assert!(config.bundler.report);
        // Untouched sections keep their defaults.
        assert_eq!(config.paths.sources, "src/");
    }

    #[test]
    #[serial]
    fn explicit_missing_file_is_an_error() {
        let err = KilnConfig::load(Some(Path::new("no-such-kiln.config.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    #[serial]
    fn malformed_file_reports_a_hint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiln.config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = KilnConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Hint:"));
    }

    #[test]
    #[serial]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiln.config.json");
        std::fs::write(&path, r#"{ "paths": { "sources": "from-file/" } }"#).unwrap();

        unsafe { std::env::set_var("KILN_PATHS_SOURCES", "from-env/") };
        let config = KilnConfig::load(Some(&path));
        unsafe { std::env::remove_var("KILN_PATHS_SOURCES") };

        assert_eq!(config.unwrap().paths.sources, "from-env/");
    }
}

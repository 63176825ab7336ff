//! The bundle manifest: final output names, written next to the bundle.
//!
//! Reference injection reads the manifest from disk instead of holding
//! adapter state, so the pipeline steps stay independent of each other.

use std::fs;
use std::path::Path;

use kiln_config::Mode;
use serde::{Deserialize, Serialize};

use crate::error::{BundlerError, Result};

/// Record of one compilation's final file names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    /// Final script bundle file name
    pub script: String,

    /// Final style bundle file name, absent when no stylesheet was emitted
    pub style: Option<String>,

    /// Every other emitted file (secondary chunks, referenced assets, maps)
    pub assets: Vec<String>,

    /// Mode the bundle was compiled for
    pub mode: Mode,

    /// Wall-clock duration of the compilation in milliseconds
    pub duration_ms: u64,
}

impl BundleManifest {
    pub const FILE_NAME: &'static str = "manifest.json";

    /// Write the manifest into `dir` as pretty-printed JSON.
    ///
    /// Uses a temp-file-and-rename write so a concurrent reader never sees
    /// a truncated document.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BundlerError::WriteFailure(format!("manifest serialization: {e}")))?;
        let target = dir.join(Self::FILE_NAME);
        let temp = target.with_extension("json.tmp");
        fs::write(&temp, json).map_err(|e| {
            BundlerError::WriteFailure(format!("Failed to write '{}': {e}", temp.display()))
        })?;
        fs::rename(&temp, &target).map_err(|e| {
            BundlerError::WriteFailure(format!("Failed to rename '{}': {e}", target.display()))
        })?;
        Ok(())
    }

    /// Read a manifest previously written into `dir`.
    pub fn read_from(dir: &Path) -> Result<Self> {
        let path = dir.join(Self::FILE_NAME);
        let raw = fs::read_to_string(&path)?;
        serde_json::from_str(&raw).map_err(|e| BundlerError::Parse {
            path,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BundleManifest {
        BundleManifest {
            script: "bundle.a1b2c3d4.min.js".to_string(),
            style: Some("bundle.a1b2c3d4.min.css".to_string()),
            assets: vec!["logo.9f8e7d6c.png".to_string()],
            mode: Mode::Production,
            duration_ms: 412,
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = sample();
        manifest.write_to(dir.path()).unwrap();

        let read = BundleManifest::read_from(dir.path()).unwrap();
        assert_eq!(read, manifest);
    }

    #[test]
    fn missing_manifest_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BundleManifest::read_from(dir.path()).unwrap_err();
        assert!(matches!(err, BundlerError::Io(_)));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"durationMs\""));
        assert!(json.contains("\"production\""));
    }
}

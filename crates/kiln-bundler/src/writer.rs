//! Bundle output writing with naming, path validation and atomic writes.
//!
//! The engine emits chunks and assets under its own names; this module
//! maps them onto the configured naming templates (`[hash]` substituted
//! from content), validates every target path against traversal, writes
//! the set atomically with rollback, removes stale files from earlier
//! runs and records the result in a manifest.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use path_clean::PathClean;
use rolldown::BundleOutput;
use rolldown_common::Output;

use crate::error::{BundlerError, Result};
use crate::generated::GeneratedConfig;
use crate::manifest::BundleManifest;
use crate::plugins::CapturedAsset;

/// Entry chunk name assigned by the synthetic entry.
const ENTRY_NAME: &str = "main";

/// Write one compilation's output into the bundle output directory and
/// return the manifest describing it.
pub fn write_bundle(
    output: &BundleOutput,
    config: &GeneratedConfig,
    captured: Vec<CapturedAsset>,
    started: Instant,
) -> Result<BundleManifest> {
    let dir = validate_and_normalize_dir(&config.out_dir)?;
    fs::create_dir_all(&dir).map_err(|e| {
        BundlerError::WriteFailure(format!(
            "failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut operations: Vec<(PathBuf, Vec<u8>)> = Vec::new();
    let mut script = None;
    let mut style = None;
    let mut extra_assets = Vec::new();

    for item in &output.assets {
        match item {
            Output::Chunk(chunk) => {
                let final_name = chunk_final_name(
                    config,
                    chunk.name.as_str(),
                    chunk.is_entry,
                    chunk.filename.as_str(),
                    chunk.code.as_bytes(),
                );
                let mut code = chunk.code.clone();

                if let Some(map) = &chunk.map {
                    let map_name = format!("{final_name}.map");
                    code = rewrite_sourcemap_reference(&code, &map_name);
                    operations.push((
                        validate_output_path(&dir, &map_name)?,
                        map.to_json_string().into_bytes(),
                    ));
                    extra_assets.push(map_name);
                }

                if chunk.is_entry && chunk.name.as_str() == ENTRY_NAME {
                    script = Some(final_name.clone());
                } else {
                    extra_assets.push(final_name.clone());
                }
                operations.push((validate_output_path(&dir, &final_name)?, code.into_bytes()));
            }
            Output::Asset(asset) => {
                let filename = asset.filename.as_str();
                // Engine-written sourcemap files are superseded by the
                // renamed maps emitted above.
                if filename.ends_with(".map") {
                    continue;
                }
                let bytes = asset.source.as_bytes().to_vec();
                let final_name = if is_entry_stylesheet(filename) {
                    let name = render_name(&config.style_template, &bytes);
                    style = Some(name.clone());
                    name
                } else {
                    extra_assets.push(filename.to_string());
                    filename.to_string()
                };
                operations.push((validate_output_path(&dir, &final_name)?, bytes));
            }
        }
    }

    let script = script.ok_or_else(|| {
        BundlerError::Engine("compilation produced no entry chunk".to_string())
    })?;

    write_files_atomic(&operations)?;

    let mut assets: Vec<String> = captured.iter().map(|a| a.file_name.clone()).collect();
    assets.extend(extra_assets);
    assets.sort();
    assets.dedup();

    let mut keep: HashSet<String> = assets.iter().cloned().collect();
    keep.insert(script.clone());
    if let Some(style) = &style {
        keep.insert(style.clone());
    }
    keep.insert(BundleManifest::FILE_NAME.to_string());

    if config.report {
        write_report(&dir, &operations, &captured)?;
        keep.insert(REPORT_FILE_NAME.to_string());
    }
    remove_stale(&dir, &keep)?;

    let manifest = BundleManifest {
        script,
        style,
        assets,
        mode: config.mode,
        duration_ms: started.elapsed().as_millis() as u64,
    };
    manifest.write_to(&dir)?;

    Ok(manifest)
}

/// Final name for a chunk: the entry chunk takes the configured script
/// template, secondary chunks keep their engine names.
fn chunk_final_name(
    config: &GeneratedConfig,
    name: &str,
    is_entry: bool,
    filename: &str,
    code: &[u8],
) -> String {
    if is_entry && name == ENTRY_NAME {
        render_name(&config.script_template, code)
    } else {
        filename.to_string()
    }
}

/// The stylesheet extracted from the entry graph carries the entry name.
fn is_entry_stylesheet(filename: &str) -> bool {
    filename.ends_with(".css")
        && Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| stem == ENTRY_NAME)
}

/// Substitute `[hash]` in a naming template with a short content hash.
fn render_name(template: &str, content: &[u8]) -> String {
    if !template.contains("[hash]") {
        return template.to_string();
    }
    let hash = blake3::hash(content).to_hex();
    template.replace("[hash]", &hash.as_str()[..8])
}

/// Point the inline sourcemap reference at the renamed map file.
fn rewrite_sourcemap_reference(code: &str, map_name: &str) -> String {
    const MARKER: &str = "//# sourceMappingURL=";
    let mut base = match code.rfind(MARKER) {
        Some(at) => code[..at].trim_end().to_string(),
        None => code.trim_end().to_string(),
    };
    base.push_str(&format!("\n{MARKER}{map_name}\n"));
    base
}

/// File name of the optional bundle size report.
pub const REPORT_FILE_NAME: &str = "report.json";

/// Byte sizes of everything this run produced, written when the report
/// toggle is on.
fn write_report(
    dir: &Path,
    operations: &[(PathBuf, Vec<u8>)],
    captured: &[CapturedAsset],
) -> Result<()> {
    let mut entries: Vec<serde_json::Value> = operations
        .iter()
        .filter_map(|(path, bytes)| {
            let name = path.file_name()?.to_str()?;
            Some(serde_json::json!({ "file": name, "bytes": bytes.len() }))
        })
        .collect();
    entries.extend(
        captured
            .iter()
            .map(|a| serde_json::json!({ "file": a.file_name, "bytes": a.bytes })),
    );
    entries.sort_by(|a, b| a["file"].as_str().cmp(&b["file"].as_str()));

    let json = serde_json::to_vec_pretty(&entries).map_err(|e| {
        BundlerError::WriteFailure(format!("failed to serialize bundle report: {e}"))
    })?;
    write_files_atomic(&[(dir.join(REPORT_FILE_NAME), json)])
}

/// Remove top-level files from earlier runs that this run did not
/// produce. Directories are left alone.
fn remove_stale(dir: &Path, keep: &HashSet<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !keep.contains(name) {
            tracing::debug!(file = name, "removing stale output");
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

fn validate_and_normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();
    let absolute = if cleaned.is_absolute() {
        cleaned
    } else {
        std::env::current_dir()
            .map_err(|e| {
                BundlerError::InvalidOutputPath(format!("failed to get current directory: {e}"))
            })?
            .join(&cleaned)
            .clean()
    };
    Ok(absolute)
}

/// Reject traversal: clean the name, join, clean again and require the
/// result to stay under the base directory.
fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(BundlerError::InvalidOutputPath(
            "filename contains null byte".to_string(),
        ));
    }

    let filename_path = Path::new(filename).clean();
    let full_path = base_dir.join(&filename_path).clean();

    if !full_path.starts_with(base_dir) {
        return Err(BundlerError::InvalidOutputPath(format!(
            "path '{}' escapes output directory '{}'",
            filename,
            base_dir.display()
        )));
    }

    Ok(full_path)
}

/// Two-phase write: everything lands under a `.tmp` name first, then the
/// set is renamed into place. Any failure rolls back the temp files.
fn write_files_atomic(operations: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    let mut temp_files = Vec::new();

    for (target_path, content) in operations {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                BundlerError::WriteFailure(format!(
                    "failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = temp_name(target_path);
        fs::write(&temp_path, content).map_err(|e| {
            cleanup_temp_files(&temp_files);
            BundlerError::WriteFailure(format!(
                "failed to write temporary file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

        temp_files.push((temp_path, target_path.clone()));
    }

    for (temp_path, target_path) in &temp_files {
        fs::rename(temp_path, target_path).map_err(|e| {
            cleanup_temp_files(&temp_files);
            BundlerError::WriteFailure(format!(
                "failed to rename '{}' to '{}': {}",
                temp_path.display(),
                target_path.display(),
                e
            ))
        })?;
    }

    Ok(())
}

/// Append `.tmp` rather than replacing the extension, so `bundle.js` and
/// `bundle.css` in the same directory never collide on a temp name.
fn temp_name(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp_path, _) in temp_files {
        if temp_path.exists() {
            if let Err(e) = fs::remove_file(temp_path) {
                tracing::warn!(
                    file = %temp_path.display(),
                    error = %e,
                    "failed to clean up temporary file"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_config::{BuildContext, KilnConfig, Mode};
    use std::sync::Arc;

    fn config(mode: Mode) -> GeneratedConfig {
        let ctx = BuildContext::new(mode, Arc::new(KilnConfig::default()));
        GeneratedConfig::from_context(&ctx).unwrap()
    }

    #[test]
    fn entry_chunk_takes_the_script_template() {
        let production = config(Mode::Production);
        let name = chunk_final_name(&production, "main", true, "main.js", b"var a=1;");
        assert!(name.starts_with("bundle."));
        assert!(name.ends_with(".min.js"));
        assert!(!name.contains("[hash]"));

        let development = config(Mode::Development);
        let name = chunk_final_name(&development, "main", true, "main.js", b"var a=1;");
        assert_eq!(name, "bundle.js");
    }

    #[test]
    fn secondary_chunks_keep_engine_names() {
        let production = config(Mode::Production);
        let name = chunk_final_name(&production, "chunk", false, "chunk-abc.js", b"x");
        assert_eq!(name, "chunk-abc.js");
    }

    #[test]
    fn hash_substitution_is_stable_per_content() {
        assert_eq!(
            render_name("bundle.[hash].min.js", b"same"),
            render_name("bundle.[hash].min.js", b"same")
        );
        assert_ne!(
            render_name("bundle.[hash].min.js", b"one"),
            render_name("bundle.[hash].min.js", b"two")
        );
        assert_eq!(render_name("bundle.js", b"anything"), "bundle.js");
    }

    #[test]
    fn entry_stylesheet_is_detected_by_stem() {
        assert!(is_entry_stylesheet("main.css"));
        assert!(!is_entry_stylesheet("vendor.css"));
        assert!(!is_entry_stylesheet("main.js"));
    }

    #[test]
    fn sourcemap_reference_points_at_renamed_map() {
        let code = "var a=1;\n//# sourceMappingURL=main.js.map\n";
        let rewritten = rewrite_sourcemap_reference(code, "bundle.js.map");
        assert!(rewritten.ends_with("//# sourceMappingURL=bundle.js.map\n"));
        assert!(!rewritten.contains("main.js.map"));

        let bare = rewrite_sourcemap_reference("var a=1;", "bundle.js.map");
        assert!(bare.contains("var a=1;"));
        assert!(bare.ends_with("//# sourceMappingURL=bundle.js.map\n"));
    }

    #[test]
    fn traversal_is_rejected() {
        let base = Path::new("/tmp/output");
        assert!(validate_output_path(base, "bundle.js").is_ok());
        assert!(validate_output_path(base, "../etc/passwd").is_err());
        assert!(validate_output_path(base, "safe/../../../../etc/passwd").is_err());
        assert!(validate_output_path(base, "file\0name.js").is_err());
    }

    #[test]
    fn stale_files_are_removed_and_kept_files_survive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bundle.js"), "new").unwrap();
        fs::write(dir.path().join("bundle.old1234.min.js"), "old").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let keep: HashSet<String> = ["bundle.js".to_string()].into_iter().collect();
        remove_stale(dir.path(), &keep).unwrap();

        assert!(dir.path().join("bundle.js").exists());
        assert!(!dir.path().join("bundle.old1234.min.js").exists());
        assert!(dir.path().join("nested").exists());
    }

    #[test]
    fn atomic_write_rolls_back_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.js");
        // A target whose parent is a file cannot be created.
        fs::write(dir.path().join("blocked"), "file").unwrap();
        let bad = dir.path().join("blocked").join("b.js");

        let operations = vec![
            (good.clone(), b"one".to_vec()),
            (bad, b"two".to_vec()),
        ];
        assert!(write_files_atomic(&operations).is_err());
        assert!(!good.exists());
        assert!(!temp_name(&good).exists());
    }
}

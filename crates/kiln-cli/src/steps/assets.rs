//! Script and style compilation through the bundler adapter.

use std::path::Path;
use std::time::Duration;

use kiln_bundler::{BundleEvent, BundleManifest, BundlerAdapter};
use kiln_config::{BuildContext, PathRole};

use crate::error::Result;
use crate::ui;

/// Compile scripts and styles into the temporary assets directory.
///
/// Runs the adapter once, relays its lifecycle events to the terminal, and
/// in production prints the bundle summary when reporting is enabled.
pub async fn compile_assets(adapter: &BundlerAdapter, ctx: &BuildContext) -> Result<()> {
    let mut events = adapter.subscribe();
    let outcome = adapter.run(ctx).await;

    while let Ok(event) = events.try_recv() {
        match event {
            BundleEvent::Started => tracing::debug!("bundler started"),
            BundleEvent::Completed { duration_ms, .. } => {
                ui::success(&format!(
                    "Assets compiled in {}",
                    ui::format_duration(Duration::from_millis(duration_ms))
                ));
            }
            BundleEvent::Failed { error } => tracing::error!(%error, "bundler failed"),
        }
    }

    let manifest = outcome?;
    let assets_temp = ctx.path(PathRole::AssetsTemp)?;

    if ctx.config().bundler.show_assets {
        for name in emitted_names(&manifest) {
            ui::info(&format!("emitted {name}"));
        }
    }

    if ctx.mode().is_production() && ctx.config().bundler.report {
        let entries = summary_entries(assets_temp, &manifest);
        ui::print_build_summary(&entries, Duration::from_millis(manifest.duration_ms));
    }

    Ok(())
}

/// Every file name the compilation produced, bundle entries first.
fn emitted_names(manifest: &BundleManifest) -> Vec<&str> {
    let mut names = vec![manifest.script.as_str()];
    if let Some(style) = &manifest.style {
        names.push(style.as_str());
    }
    names.extend(manifest.assets.iter().map(String::as_str));
    names
}

/// Pair each emitted file with its on-disk size for the summary table.
fn summary_entries(dir: &Path, manifest: &BundleManifest) -> Vec<(String, u64)> {
    emitted_names(manifest)
        .into_iter()
        .map(|name| {
            let size = std::fs::metadata(dir.join(name)).map(|m| m.len()).unwrap_or(0);
            (name.to_string(), size)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use kiln_config::Mode;

    fn manifest() -> BundleManifest {
        BundleManifest {
            script: "bundle.js".to_string(),
            style: Some("bundle.css".to_string()),
            assets: vec!["logo.png".to_string()],
            mode: Mode::Development,
            duration_ms: 100,
        }
    }

    #[test]
    fn emitted_names_list_bundles_before_assets() {
        let names = emitted_names(&manifest());
        assert_eq!(names, vec!["bundle.js", "bundle.css", "logo.png"]);
    }

    #[test]
    fn emitted_names_skip_an_absent_stylesheet() {
        let mut manifest = manifest();
        manifest.style = None;
        assert_eq!(emitted_names(&manifest), vec!["bundle.js", "logo.png"]);
    }

    #[test]
    fn summary_entries_read_sizes_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bundle.js"), b"12345").unwrap();
        fs::write(dir.path().join("bundle.css"), b"123").unwrap();

        let entries = summary_entries(dir.path(), &manifest());
        assert_eq!(entries[0], ("bundle.js".to_string(), 5));
        assert_eq!(entries[1], ("bundle.css".to_string(), 3));
        // Missing files report zero instead of failing the summary.
        assert_eq!(entries[2], ("logo.png".to_string(), 0));
    }
}

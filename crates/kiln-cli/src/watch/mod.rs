//! Watch mode: stage-scoped rebuilds on change plus live reload.
//!
//! Three sources of change feed the loop. The bundler adapter watches the
//! script and style trees itself and reports through its event hub; the
//! [`FileWatcher`] here covers the image and template trees; Ctrl-C ends
//! the session. Every successful rebuild republishes the affected area and
//! broadcasts a reload event to connected browsers.

mod server;
mod state;
mod watcher;

pub use server::LiveReloadServer;
pub use state::ServerState;
pub use watcher::{FileChange, FileWatcher};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use kiln_bundler::{BundleEvent, BundlerAdapter};
use kiln_config::{BuildContext, PathRole};
use tokio::signal;

use crate::error::Result;
use crate::steps;
use crate::steps::publish::PublishArea;
use crate::ui;

const DEBOUNCE: Duration = Duration::from_millis(300);

/// Which rebuild a changed path triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeDomain {
    /// Recompress and republish images
    Images,
    /// Globals document changed, every template goes stale
    Globals,
    /// A single template, partial, or static page
    Templates,
}

/// Watch the source trees until Ctrl-C, rebuilding the affected stage on
/// each change.
pub async fn watch(ctx: &BuildContext, adapter: Arc<BundlerAdapter>) -> Result<()> {
    let images_root = ctx.path(PathRole::ImagesSource)?.to_path_buf();
    let templates_root = ctx.path(PathRole::TemplatesSource)?.to_path_buf();

    let state = Arc::new(ServerState::new());

    let livereload = &ctx.config().settings.livereload;
    if livereload.enabled {
        let server = LiveReloadServer::new(
            state.clone(),
            ctx.path(PathRole::Public)?.to_path_buf(),
            livereload.host.clone(),
            livereload.port,
        );
        tokio::spawn(async move {
            if let Err(e) = server.start().await {
                ui::error(&format!("Live reload server error: {e}"));
            }
        });
    }

    // Subscribe before the adapter's watch loop starts so no completion is
    // missed, then relay completions into republished assets and reloads.
    let mut events = adapter.subscribe();
    {
        let ctx = ctx.clone();
        let state = state.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    BundleEvent::Started => {}
                    BundleEvent::Completed { duration_ms, .. } => {
                        ui::success(&format!(
                            "Assets recompiled in {}",
                            ui::format_duration(Duration::from_millis(duration_ms))
                        ));
                        match steps::publish::publish(&ctx, Some(PublishArea::Assets), None).await {
                            Ok(_) => state.broadcast("reload").await,
                            Err(e) => ui::error(&format!("Failed to publish assets: {e}")),
                        }
                    }
                    BundleEvent::Failed { error } => {
                        ui::error(&format!("Asset compilation failed: {error}"));
                    }
                }
            }
        });
    }

    {
        let ctx = ctx.clone();
        let adapter = adapter.clone();
        tokio::spawn(async move {
            if let Err(e) = adapter.watch(&ctx).await {
                ui::error(&format!("Bundler watch error: {e}"));
            }
        });
    }

    let (watcher, mut changes) =
        FileWatcher::new(vec![images_root.clone(), templates_root.clone()], DEBOUNCE)?;
    for root in watcher.roots() {
        ui::info(&format!("Watching {}", root.display()));
    }
    ui::info("Press Ctrl+C to stop");

    loop {
        tokio::select! {
            Some(change) = changes.recv() => {
                handle_change(change, ctx, &state, &images_root, &templates_root).await;
            }
            _ = signal::ctrl_c() => {
                ui::info("Shutting down...");
                break;
            }
        }
    }

    Ok(())
}

/// Rebuild the stage a change belongs to and notify connected clients.
async fn handle_change(
    change: FileChange,
    ctx: &BuildContext,
    state: &ServerState,
    images_root: &Path,
    templates_root: &Path,
) {
    let path = change.path().to_path_buf();
    let globals = ctx.config().files.template_globals.as_str();
    let Some(domain) = classify(&path, images_root, templates_root, globals) else {
        return;
    };

    ui::info(&format!("File changed: {}", path.display()));

    let result = match domain {
        ChangeDomain::Images => rebuild_images(ctx).await,
        ChangeDomain::Globals => rebuild_markup(ctx, None).await,
        ChangeDomain::Templates => match change {
            // The renderer cannot re-render a file that is gone.
            FileChange::Removed(_) => rebuild_markup(ctx, None).await,
            _ => rebuild_markup(ctx, Some(&path)).await,
        },
    };

    match result {
        Ok(()) => state.broadcast("reload").await,
        Err(e) => ui::error(&format!("Rebuild failed: {e}")),
    }
}

fn classify(
    path: &Path,
    images_root: &Path,
    templates_root: &Path,
    globals_name: &str,
) -> Option<ChangeDomain> {
    if path.starts_with(images_root) {
        return Some(ChangeDomain::Images);
    }
    if path.starts_with(templates_root) {
        let is_globals = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name == globals_name);
        return Some(if is_globals {
            ChangeDomain::Globals
        } else {
            ChangeDomain::Templates
        });
    }
    None
}

async fn rebuild_images(ctx: &BuildContext) -> Result<()> {
    steps::images::compress_images(ctx).await?;
    steps::publish::publish(ctx, Some(PublishArea::Images), None).await?;
    Ok(())
}

/// Re-render markup: one template when `changed` names one, otherwise all.
async fn rebuild_markup(ctx: &BuildContext, changed: Option<&Path>) -> Result<()> {
    match changed {
        Some(path) => steps::templates::compile_single_template(ctx, path).await?,
        None => steps::templates::compile_templates(ctx).await?,
    }
    steps::inject::inject_references(ctx).await?;
    steps::publish::publish(ctx, Some(PublishArea::Markup), Some("*.html")).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn roots() -> (PathBuf, PathBuf) {
        (
            PathBuf::from("/site/src/img"),
            PathBuf::from("/site/src/templates"),
        )
    }

    #[test]
    fn image_changes_map_to_the_image_domain() {
        let (img, tpl) = roots();
        assert_eq!(
            classify(Path::new("/site/src/img/logo.png"), &img, &tpl, "globals.json"),
            Some(ChangeDomain::Images)
        );
    }

    #[test]
    fn the_globals_document_triggers_a_full_render() {
        let (img, tpl) = roots();
        assert_eq!(
            classify(
                Path::new("/site/src/templates/globals.json"),
                &img,
                &tpl,
                "globals.json"
            ),
            Some(ChangeDomain::Globals)
        );
    }

    #[test]
    fn templates_and_partials_map_to_the_template_domain() {
        let (img, tpl) = roots();
        assert_eq!(
            classify(Path::new("/site/src/templates/index.j2"), &img, &tpl, "globals.json"),
            Some(ChangeDomain::Templates)
        );
        assert_eq!(
            classify(
                Path::new("/site/src/templates/partials/head.j2"),
                &img,
                &tpl,
                "globals.json"
            ),
            Some(ChangeDomain::Templates)
        );
    }

    #[test]
    fn unrelated_paths_are_ignored() {
        let (img, tpl) = roots();
        assert_eq!(
            classify(Path::new("/site/src/js/main.js"), &img, &tpl, "globals.json"),
            None
        );
    }
}

//! Template compilation: render source templates against the globals
//! document into the temporary markup tree.
//!
//! With the template engine enabled, top-level `*.j2` files render to
//! `.html`; subdirectories hold partials reachable through includes. With
//! the engine disabled, every `*.html` file in the tree passes through the
//! renderer instead, so plain markup publishes verbatim.

use std::path::{Path, PathBuf};

use kiln_config::{BuildContext, PathRole};
use minijinja::Environment;
use walkdir::WalkDir;

use crate::error::{CliError, Result, ResultExt};

/// Render every source template.
pub async fn compile_templates(ctx: &BuildContext) -> Result<()> {
    let source_dir = ctx.path(PathRole::TemplatesSource)?;
    if !source_dir.is_dir() {
        tracing::debug!(path = %source_dir.display(), "no template sources");
        return Ok(());
    }

    let names = template_names(ctx, source_dir)?;
    render_templates(ctx, source_dir, &names).await?;
    tracing::info!(rendered = names.len(), "templates compiled");
    Ok(())
}

/// Re-render just one changed template.
///
/// Falls back to a full compile when the change is not a renderable
/// template itself - a partial or the globals document affects other
/// templates' output.
pub async fn compile_single_template(ctx: &BuildContext, changed: &Path) -> Result<()> {
    let source_dir = ctx.path(PathRole::TemplatesSource)?;
    match template_name_for(ctx, source_dir, changed) {
        Some(name) => {
            render_templates(ctx, source_dir, std::slice::from_ref(&name)).await?;
            tracing::info!(template = name.as_str(), "template recompiled");
            Ok(())
        }
        None => compile_templates(ctx).await,
    }
}

/// Loader-relative names of the templates to render.
fn template_names(ctx: &BuildContext, source_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();

    if ctx.config().settings.template_engine {
        for entry in std::fs::read_dir(source_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "j2") {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
    } else {
        for entry in WalkDir::new(source_dir) {
            let entry = entry.map_err(|e| {
                CliError::Custom(format!("Failed to walk '{}': {e}", source_dir.display()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(source_dir) else {
                continue;
            };
            if rel.extension().is_some_and(|ext| ext == "html") {
                names.push(loader_name(rel));
            }
        }
    }

    names.sort();
    Ok(names)
}

/// The loader name for `changed` if it is a renderable template on its own.
fn template_name_for(ctx: &BuildContext, source_dir: &Path, changed: &Path) -> Option<String> {
    let rel = changed.strip_prefix(source_dir).ok()?;
    if rel == Path::new(&ctx.config().files.template_globals) {
        return None;
    }

    if ctx.config().settings.template_engine {
        let top_level = rel.parent().is_none_or(|p| p.as_os_str().is_empty());
        (top_level && rel.extension().is_some_and(|ext| ext == "j2"))
            .then(|| loader_name(rel))
    } else {
        rel.extension()
            .is_some_and(|ext| ext == "html")
            .then(|| loader_name(rel))
    }
}

async fn render_templates(ctx: &BuildContext, source_dir: &Path, names: &[String]) -> Result<()> {
    let globals = load_globals(ctx)?;
    let dest_dir = ctx.path(PathRole::TemplatesTemp)?;

    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader(source_dir));
    let context = minijinja::Value::from_serialize(&globals);

    for name in names {
        let template = env.get_template(name)?;
        let rendered = template.render(&context)?;

        let target = dest_dir.join(output_name(name));
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, rendered).await?;
        tracing::debug!(template = name.as_str(), "template rendered");
    }
    Ok(())
}

/// The shared globals document; absent means an empty context.
fn load_globals(ctx: &BuildContext) -> Result<serde_json::Value> {
    let dir = ctx.path(PathRole::TemplatesSource)?;
    let path = dir.join(&ctx.config().files.template_globals);

    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no globals document");
            return Ok(serde_json::Value::Object(Default::default()));
        }
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&raw)
        .context(format!("Invalid JSON in '{}'", path.display()))
        .with_hint("Check the globals document syntax")
}

/// Rendered `*.j2` templates become `*.html`; pass-through markup keeps its name.
fn output_name(name: &str) -> String {
    match name.strip_suffix(".j2") {
        Some(stem) => format!("{stem}.html"),
        None => name.to_string(),
    }
}

/// Relative path as a loader name (forward slashes).
fn loader_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

//! Publishing: copy temporary output into the public tree.
//!
//! The temporary tree is organized by area (assets, images, markup), and
//! every area has its own destination under the public root - markup in
//! particular may publish at the public root itself. Publishing copies files
//! matching a glob mask from one area (or all of them) into the matching
//! destination, preserving relative structure within the area.

use globset::{Glob, GlobSet, GlobSetBuilder};
use kiln_config::{BuildContext, PathRole};
use walkdir::WalkDir;

use crate::error::{CliError, Result};

/// One publishable area of the temporary tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishArea {
    Assets,
    Images,
    Markup,
}

impl PublishArea {
    pub const ALL: [PublishArea; 3] = [
        PublishArea::Assets,
        PublishArea::Images,
        PublishArea::Markup,
    ];

    fn roles(self) -> (PathRole, PathRole) {
        match self {
            PublishArea::Assets => (PathRole::AssetsTemp, PathRole::AssetsResult),
            PublishArea::Images => (PathRole::ImagesTemp, PathRole::ImagesResult),
            PublishArea::Markup => (PathRole::TemplatesTemp, PathRole::TemplatesResult),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PublishArea::Assets => "assets",
            PublishArea::Images => "images",
            PublishArea::Markup => "markup",
        }
    }
}

/// Copy files matching `mask` from the temporary area(s) into the public
/// tree. Defaults publish everything: every area, every file.
///
/// Returns the number of files copied. Absent source areas publish nothing.
pub async fn publish(
    ctx: &BuildContext,
    area: Option<PublishArea>,
    mask: Option<&str>,
) -> Result<usize> {
    let matcher = build_matcher(mask.unwrap_or("*"))?;
    let areas: &[PublishArea] = match &area {
        Some(area) => std::slice::from_ref(area),
        None => &PublishArea::ALL,
    };

    let mut copied = 0;
    for area in areas {
        copied += publish_area(ctx, *area, &matcher).await?;
    }

    tracing::debug!(copied, "publish finished");
    Ok(copied)
}

/// Compile the publish mask. globset's defaults let `*` cross path
/// separators, so `*.html` also matches nested markup.
fn build_matcher(mask: &str) -> Result<GlobSet> {
    let glob = Glob::new(mask)
        .map_err(|e| CliError::Custom(format!("Invalid publish mask '{mask}': {e}")))?;
    let mut builder = GlobSetBuilder::new();
    builder.add(glob);
    builder
        .build()
        .map_err(|e| CliError::Custom(format!("Invalid publish mask '{mask}': {e}")))
}

async fn publish_area(ctx: &BuildContext, area: PublishArea, matcher: &GlobSet) -> Result<usize> {
    let (source_role, dest_role) = area.roles();
    let source = ctx.path(source_role)?;
    if !source.is_dir() {
        return Ok(0);
    }
    let dest = ctx.path(dest_role)?.to_path_buf();

    let mut copied = 0;
    for entry in WalkDir::new(source) {
        let entry = entry
            .map_err(|e| CliError::Custom(format!("Failed to walk '{}': {e}", source.display())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(source) else {
            continue;
        };
        if !matcher.is_match(rel) {
            continue;
        }

        let target = dest.join(rel);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(entry.path(), &target).await?;
        copied += 1;
    }

    if copied > 0 {
        tracing::debug!(area = area.label(), copied, "area published");
    }
    Ok(copied)
}

//! Output cleaning steps.
//!
//! Both cleans are idempotent: an absent target is success.

use std::path::Path;

use kiln_config::{BuildContext, PathRole};

use crate::error::Result;

/// Delete the entire temporary working directory.
pub async fn clean_temp_output(ctx: &BuildContext) -> Result<()> {
    let temp = ctx.path(PathRole::Temp)?;
    remove_dir_if_present(temp).await?;
    tracing::debug!(path = %temp.display(), "temporary output cleaned");
    Ok(())
}

/// Delete the published build output.
///
/// Removes the assets and images result directories wholesale. The markup
/// output is removed the same way when it lives in its own directory; when
/// the markup directory fragment is empty the templates publish at the
/// public root, so only top-level `*.html` files are deleted there.
pub async fn clean_public_output(ctx: &BuildContext) -> Result<()> {
    remove_dir_if_present(ctx.path(PathRole::AssetsResult)?).await?;
    remove_dir_if_present(ctx.path(PathRole::ImagesResult)?).await?;

    let markup = ctx.path(PathRole::TemplatesResult)?;
    let public = ctx.path(PathRole::Public)?;
    if markup == public {
        remove_html_files(public).await?;
    } else {
        remove_dir_if_present(markup).await?;
    }

    tracing::debug!("public output cleaned");
    Ok(())
}

async fn remove_dir_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Delete top-level `*.html` files in `dir`, leaving everything else alone.
async fn remove_html_files(dir: &Path) -> Result<()> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && path.extension().is_some_and(|ext| ext == "html")
        {
            tokio::fs::remove_file(&path).await?;
        }
    }
    Ok(())
}

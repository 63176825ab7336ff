//! Development command: initial build, then watch mode.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use kiln_bundler::BundlerAdapter;
use kiln_config::{BuildContext, KilnConfig, Mode};

use crate::error::Result;
use crate::ui;
use crate::{pipeline, watch};

/// Run the development pipeline, then keep watching for changes.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let start = Instant::now();

    let config = KilnConfig::load(config_path)?;
    let ctx = BuildContext::new(Mode::Development, Arc::new(config));
    let adapter = Arc::new(BundlerAdapter::new());

    pipeline::development(adapter.clone()).run(&ctx).await?;

    ui::success(&format!(
        "Initial build completed in {}",
        ui::format_duration(start.elapsed())
    ));

    watch::watch(&ctx, adapter).await?;

    ui::success("Stopped");
    Ok(())
}

//! Production build command.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use kiln_bundler::BundlerAdapter;
use kiln_config::{BuildContext, KilnConfig, Mode};

use crate::error::Result;
use crate::pipeline;
use crate::ui;

/// Run the production pipeline once, start to finish.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let start = Instant::now();

    let config = KilnConfig::load(config_path)?;
    let ctx = BuildContext::new(Mode::Production, Arc::new(config));
    let adapter = Arc::new(BundlerAdapter::new());

    pipeline::production(adapter).run(&ctx).await?;

    ui::success(&format!(
        "Build completed in {}",
        ui::format_duration(start.elapsed())
    ));
    Ok(())
}

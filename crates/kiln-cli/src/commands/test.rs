//! Test command: a stable seam for CI, no test runner is wired up yet.

use crate::error::Result;
use crate::ui;

/// Succeed immediately so `kiln test` can sit in CI scripts today.
pub async fn run() -> Result<()> {
    ui::info("No tests configured");
    Ok(())
}

//! Engine plugins wiring Kiln's asset rules into the module graph.
//!
//! Three plugins cover what the graph needs beyond plain JavaScript:
//! virtual modules (the synthetic entry and build-data modules), binary
//! asset handling, and stylesheet processing.

mod assets;
mod css;
mod virtuals;

pub use assets::{AssetRegistry, AssetRulesPlugin, CapturedAsset};
pub use css::StylesPlugin;
pub use virtuals::VirtualModulesPlugin;

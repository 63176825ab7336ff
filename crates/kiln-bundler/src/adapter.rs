//! The bundler adapter: one seam between Kiln and the engine.
//!
//! The adapter owns the derived engine configuration (cached per mode),
//! the event hub, and the two ways of running the engine: a one-shot
//! compilation and a watch loop recompiling on source changes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{RecursiveMode, Watcher};
use rolldown::{BundlerBuilder, InputItem};
use rolldown_plugin::__inner::SharedPluginable;
use tokio::sync::mpsc;

use kiln_config::{BuildContext, PathRole};

use crate::error::{BundlerError, Result};
use crate::events::{BundleEvent, EventHub};
use crate::generated::{ENTRY_SPECIFIER, GeneratedConfig};
use crate::manifest::BundleManifest;
use crate::plugins::{AssetRegistry, AssetRulesPlugin, StylesPlugin, VirtualModulesPlugin};
use crate::writer;

/// Quiet window applied per path before a change triggers a recompile.
const DEBOUNCE: Duration = Duration::from_millis(250);

/// Wraps the engine behind a stable interface.
///
/// Development reuses one derived configuration across recompiles;
/// production derives a fresh one per run and invalidates anything
/// cached, so a production build never sees development-flavored
/// settings.
#[derive(Debug, Default)]
pub struct BundlerAdapter {
    events: EventHub,
    cached: parking_lot::Mutex<Option<Arc<GeneratedConfig>>>,
}

impl BundlerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to compilation lifecycle events.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<BundleEvent> {
        self.events.subscribe()
    }

    /// Derived engine configuration for the context's mode.
    ///
    /// Development returns the same shared value until invalidated;
    /// production always derives fresh and drops the cache.
    pub fn config_for(&self, ctx: &BuildContext) -> Result<Arc<GeneratedConfig>> {
        if ctx.mode().is_production() {
            let config = Arc::new(GeneratedConfig::from_context(ctx)?);
            *self.cached.lock() = None;
            return Ok(config);
        }

        let mut cached = self.cached.lock();
        if let Some(config) = cached.as_ref() {
            return Ok(Arc::clone(config));
        }
        let config = Arc::new(GeneratedConfig::from_context(ctx)?);
        *cached = Some(Arc::clone(&config));
        Ok(config)
    }

    /// Run one compilation end to end and return its manifest.
    ///
    /// Emits `Started` before the engine runs and `Completed` or
    /// `Failed` after, mirroring the returned result.
    pub async fn run(&self, ctx: &BuildContext) -> Result<BundleManifest> {
        let started = Instant::now();
        self.events.emit(BundleEvent::Started);

        match self.run_inner(ctx, started).await {
            Ok(manifest) => {
                self.events.emit(BundleEvent::Completed {
                    duration_ms: manifest.duration_ms,
                    manifest: manifest.clone(),
                });
                Ok(manifest)
            }
            Err(error) => {
                self.events.emit(BundleEvent::Failed {
                    error: error.to_string(),
                });
                Err(error)
            }
        }
    }

    async fn run_inner(&self, ctx: &BuildContext, started: Instant) -> Result<BundleManifest> {
        let config = self.config_for(ctx)?;
        tracing::debug!(mode = %ctx.mode().as_str(), "starting compilation");

        let mut options = config.to_bundler_options();
        options.input = Some(vec![InputItem {
            name: Some("main".to_string()),
            import: ENTRY_SPECIFIER.to_string(),
        }]);

        let registry = Arc::new(AssetRegistry::new());
        let plugins: Vec<SharedPluginable> = vec![
            Arc::new(VirtualModulesPlugin::new(&config)),
            Arc::new(StylesPlugin::new(config.mode.is_production())),
            Arc::new(AssetRulesPlugin::new(&config, Arc::clone(&registry))),
        ];

        let mut bundler = BundlerBuilder::default()
            .with_options(options)
            .with_plugins(plugins)
            .build()
            .map_err(|e| BundlerError::from_engine(&e))?;

        let output = bundler
            .generate()
            .await
            .map_err(|e| BundlerError::from_engine(&e))?;

        writer::write_bundle(&output, &config, registry.take(), started)
    }

    /// Watch the script and style sources and recompile on changes.
    ///
    /// Failed recompiles are reported through the event hub and logged;
    /// the loop keeps running. Runs until the task is dropped.
    pub async fn watch(&self, ctx: &BuildContext) -> Result<()> {
        let scripts = ctx.path(PathRole::ScriptsSource)?.to_path_buf();
        let styles = ctx.path(PathRole::StylesSource)?.to_path_buf();
        let vendors = ctx.path(PathRole::ScriptsVendors)?.to_path_buf();

        let (tx, mut rx) = mpsc::channel::<PathBuf>(100);
        let mut last_seen: HashMap<PathBuf, Instant> = HashMap::new();

        let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
            let Ok(event) = event else { return };
            if matches!(event.kind, notify::EventKind::Access(_)) {
                return;
            }
            for path in event.paths {
                if !is_bundle_source(&path) || path.starts_with(&vendors) {
                    continue;
                }
                let now = Instant::now();
                let debounced = last_seen
                    .get(&path)
                    .is_some_and(|seen| now.duration_since(*seen) < DEBOUNCE);
                if debounced {
                    continue;
                }
                last_seen.insert(path.clone(), now);
                let _ = tx.blocking_send(path);
            }
        })
        .map_err(|e| BundlerError::Engine(format!("failed to create watcher: {e}")))?;

        for root in [&scripts, &styles] {
            if root.exists() {
                watcher
                    .watch(root, RecursiveMode::Recursive)
                    .map_err(|e| {
                        BundlerError::Engine(format!(
                            "failed to watch '{}': {e}",
                            root.display()
                        ))
                    })?;
            }
        }
        tracing::info!(
            scripts = %scripts.display(),
            styles = %styles.display(),
            "watching sources"
        );

        while let Some(path) = rx.recv().await {
            // Coalesce the burst a single save can produce.
            while rx.try_recv().is_ok() {}
            tracing::info!(changed = %path.display(), "source changed, recompiling");
            if let Err(error) = self.run(ctx).await {
                tracing::error!(%error, "recompile failed");
            }
        }

        Ok(())
    }
}

/// Only source files the bundle graph can contain trigger recompiles.
fn is_bundle_source(path: &std::path::Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("js" | "mjs" | "css" | "json")
    )
}

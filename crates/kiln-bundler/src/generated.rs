//! Engine configuration derived from the configuration document.
//!
//! `GeneratedConfig` is built lazily by the adapter, cached per mode, and
//! translated into `BundlerOptions` just before each compilation. It is
//! data only; nothing here talks to the engine.

use std::path::{Path, PathBuf};

use kiln_config::{BuildContext, Mode, PathRole};
use path_clean::PathClean;
use rolldown::{
    BundlerOptions, GlobalsOutputOption, IsExternal, OutputFormat, Platform, RawMinifyOptions,
    ResolveOptions, SourceMapType,
};
use rustc_hash::FxHashMap;

use crate::error::{BundlerError, Result};
use crate::variables::StyleVariables;

/// Specifier of the synthetic entry module combining the style and script
/// entries into one graph, keeping the output a single named chunk.
pub const ENTRY_SPECIFIER: &str = "kiln:entry";

/// Everything the engine run needs, derived once from the document.
#[derive(Debug, Clone)]
pub struct GeneratedConfig {
    pub mode: Mode,

    /// Absolute path of the application script entry
    pub script_entry: PathBuf,

    /// Absolute path of the application style entry, when configured
    pub style_entry: Option<PathBuf>,

    /// Assets temp directory receiving the bundle output
    pub out_dir: PathBuf,

    /// Project root, used as the engine working directory
    pub project_root: PathBuf,

    /// Source tree root, exposed to imports as the `sources` alias
    pub sources_root: PathBuf,

    /// Output naming templates for the current mode (`[hash]` substituted
    /// when the bundle is written)
    pub script_template: String,
    pub style_template: String,

    /// Public URL prefix for emitted asset references
    pub public_path: String,

    /// Window-provided libraries: import specifier to global name
    pub externals: Vec<(String, String)>,

    /// Byte ceiling for data-URI inlining
    pub inline_limit: u64,

    /// Globals document, exposed to scripts and templates
    pub globals: serde_json::Value,

    /// Resolved stylesheet custom properties
    pub style_variables: StyleVariables,

    /// Build version string for the build-constants module
    pub version: String,

    pub report: bool,
    pub show_assets: bool,
    pub browsers: Vec<String>,
}

impl GeneratedConfig {
    /// Derive the engine configuration for the context's mode.
    ///
    /// Reads the globals and style-variables documents; missing data files
    /// yield empty documents. Entry files are not checked here - the engine
    /// reports unresolvable entries itself.
    pub fn from_context(ctx: &BuildContext) -> Result<Self> {
        let config = ctx.config();
        let mode = ctx.mode();

        let scripts_source = absolutize(ctx.path(PathRole::ScriptsSource)?);
        let styles_source = absolutize(ctx.path(PathRole::StylesSource)?);
        let templates_source = absolutize(ctx.path(PathRole::TemplatesSource)?);

        let script_template = config.files.script_name_for(mode).to_string();
        let style_template = config.files.style_name_for(mode).to_string();
        validate_template(&script_template)?;
        validate_template(&style_template)?;

        let globals = load_globals(&templates_source.join(&config.files.template_globals))?;
        let style_variables =
            StyleVariables::load(&styles_source.join(&config.files.style_variables))?;

        let style_entry = (!config.files.style_entry.is_empty())
            .then(|| styles_source.join(&config.files.style_entry));

        Ok(Self {
            mode,
            script_entry: scripts_source.join(&config.files.script_entry),
            style_entry,
            out_dir: absolutize(ctx.path(PathRole::AssetsTemp)?),
            project_root: absolutize(Path::new(&config.paths.root)),
            sources_root: absolutize(&concat_root(&config.paths.root, &config.paths.sources)),
            script_template,
            style_template,
            public_path: config.bundler.public_path.clone(),
            externals: config
                .bundler
                .externals
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            inline_limit: config.bundler.inline_limit,
            globals,
            style_variables,
            version: config.bundler.version.clone(),
            report: config.bundler.report && mode.is_production(),
            show_assets: config.bundler.show_assets,
            browsers: config.bundler.browsers.clone(),
        })
    }

    /// Source of the synthetic entry module: style first so stylesheet
    /// output is ordered ahead of script side effects.
    pub fn entry_source(&self) -> String {
        let mut source = String::new();
        if let Some(style) = &self.style_entry {
            source.push_str(&format!("import {:?};\n", style.to_string_lossy()));
        }
        source.push_str(&format!("import {:?};\n", self.script_entry.to_string_lossy()));
        source
    }

    /// Translate into engine options for one compilation.
    pub fn to_bundler_options(&self) -> BundlerOptions {
        let mut options = BundlerOptions {
            format: Some(OutputFormat::Iife),
            platform: Some(Platform::Browser),
            cwd: Some(self.project_root.clone()),
            ..Default::default()
        };

        options.sourcemap = match self.mode {
            Mode::Development => Some(SourceMapType::File),
            Mode::Production => None,
        };

        if self.mode.is_production() {
            options.minify = Some(RawMinifyOptions::from(true));
        }

        // External packages resolve to window globals instead of being bundled.
        options.external = Some(IsExternal::from(
            self.externals
                .iter()
                .map(|(specifier, _)| specifier.clone())
                .collect::<Vec<_>>(),
        ));
        if !self.externals.is_empty() {
            let globals: FxHashMap<String, String> = self.externals.iter().cloned().collect();
            options.globals = Some(GlobalsOutputOption::from(globals));
        }

        options.resolve = Some(ResolveOptions {
            alias: Some(vec![(
                "sources".to_string(),
                vec![Some(self.sources_root.to_string_lossy().to_string())],
            )]),
            extensions: Some(vec![
                ".js".to_string(),
                ".mjs".to_string(),
                ".json".to_string(),
                ".css".to_string(),
            ]),
            symlinks: Some(true),
            ..Default::default()
        });

        options
    }
}

/// Make a path absolute against the process working directory and clean it.
fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf().clean()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
            .clean()
    }
}

fn concat_root(root: &str, sources: &str) -> PathBuf {
    let mut path = PathBuf::new();
    if !root.is_empty() {
        path.push(root);
    }
    if !sources.is_empty() {
        path.push(sources);
    }
    path
}

fn validate_template(template: &str) -> Result<()> {
    let reason = if template.trim().is_empty() {
        Some("template is empty")
    } else if template.contains(['/', '\\']) {
        Some("template must be a bare file name")
    } else if template.contains('\0') {
        Some("template contains a null byte")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(BundlerError::InvalidNaming {
            template: template.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Read the globals document; a missing file is an empty object.
fn load_globals(path: &Path) -> Result<serde_json::Value> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no globals document, using empty object");
        return Ok(serde_json::Value::Object(Default::default()));
    }
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| BundlerError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_config::KilnConfig;
    use std::sync::Arc;

    fn context(mode: Mode) -> BuildContext {
        BuildContext::new(mode, Arc::new(KilnConfig::default()))
    }

    #[test]
    fn production_minifies_without_sourcemaps() {
        let config = GeneratedConfig::from_context(&context(Mode::Production)).unwrap();
        let options = config.to_bundler_options();
        assert!(options.minify.is_some());
        assert!(options.sourcemap.is_none());
        assert_eq!(config.script_template, "bundle.[hash].min.js");
    }

    #[test]
    fn development_keeps_sourcemaps_and_plain_names() {
        let config = GeneratedConfig::from_context(&context(Mode::Development)).unwrap();
        let options = config.to_bundler_options();
        assert!(options.minify.is_none());
        assert!(options.sourcemap.is_some());
        assert_eq!(config.script_template, "bundle.js");
    }

    #[test]
    fn entry_source_imports_style_before_script() {
        let config = GeneratedConfig::from_context(&context(Mode::Development)).unwrap();
        let source = config.entry_source();
        let style_at = source.find("main.css").expect("style import");
        let script_at = source.find("main.js").expect("script import");
        assert!(style_at < script_at);
    }

    #[test]
    fn naming_templates_must_be_bare_file_names() {
        let mut config = KilnConfig::default();
        config.files.script_name = "js/bundle.js".to_string();
        let ctx = BuildContext::new(Mode::Development, Arc::new(config));

        let err = GeneratedConfig::from_context(&ctx).unwrap_err();
        assert!(matches!(err, BundlerError::InvalidNaming { .. }));
    }

    #[test]
    fn parse_failure_of_globals_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("globals.json");
        std::fs::write(&path, "{ nope").unwrap();

        let err = load_globals(&path).unwrap_err();
        assert!(err.to_string().contains("globals.json"));
    }
}

//! The configuration document - serde types for kiln.config.json.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::context::Mode;
use crate::defaults::*;

/// Kiln configuration - loaded from kiln.config.json, the environment,
/// and built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KilnConfig {
    /// Path fragments composing the source, temporary, and public trees
    #[serde(default)]
    pub paths: PathsSection,

    /// Directory names within the source and public trees
    #[serde(default)]
    pub dirs: DirsSection,

    /// Entry file names and output naming templates
    #[serde(default)]
    pub files: FilesSection,

    /// Feature toggles
    #[serde(default)]
    pub settings: SettingsSection,

    /// Options forwarded to the bundler adapter
    #[serde(default)]
    pub bundler: BundlerSection,
}

impl KilnConfig {
    /// Generate JSON Schema for kiln.config.json.
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(KilnConfig);
        serde_json::to_value(schema).expect("Schema serialization should never fail")
    }
}

/// Root path fragments. All other locations are composed from these.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PathsSection {
    /// Project root, prepended to every composed path
    #[serde(default = "default_root")]
    pub root: String,

    /// Source tree, relative to root
    #[serde(default = "default_sources")]
    pub sources: String,

    /// Public output tree, relative to root
    #[serde(default = "default_results")]
    pub results: String,

    /// Temporary build tree, relative to the source tree
    #[serde(default = "default_temp")]
    pub temp: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            sources: default_sources(),
            results: default_results(),
            temp: default_temp(),
        }
    }
}

/// Directory names used inside the source, temporary, and public trees.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DirsSection {
    /// Bundled scripts and styles
    #[serde(default = "default_assets_dir")]
    pub assets: String,

    /// Stylesheet sources
    #[serde(default = "default_css_dir")]
    pub css: String,

    /// Script sources
    #[serde(default = "default_js_dir")]
    pub js: String,

    /// Vendored scripts, excluded from watching
    #[serde(default = "default_vendors_dir")]
    pub vendors: String,

    /// Image sources
    #[serde(default = "default_img_dir")]
    pub img: String,

    /// Template sources
    #[serde(default = "default_templates_dir")]
    pub templates: String,

    /// Rendered markup inside the public tree; empty publishes
    /// HTML files at the public root
    #[serde(default)]
    pub html: String,
}

impl Default for DirsSection {
    fn default() -> Self {
        Self {
            assets: default_assets_dir(),
            css: default_css_dir(),
            js: default_js_dir(),
            vendors: default_vendors_dir(),
            img: default_img_dir(),
            templates: default_templates_dir(),
            html: String::new(),
        }
    }
}

/// Entry file names and the development/production output naming pair.
///
/// Naming templates may contain `[hash]`, replaced with a short content
/// hash when the bundle is written.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FilesSection {
    /// Script entry file inside the scripts source directory
    #[serde(default = "default_script_entry")]
    pub script_entry: String,

    /// Style entry file inside the styles source directory
    #[serde(default = "default_style_entry")]
    pub style_entry: String,

    /// Script bundle name in development
    #[serde(default = "default_script_name")]
    pub script_name: String,

    /// Script bundle name in production
    #[serde(default = "default_script_name_production")]
    pub script_name_production: String,

    /// Style bundle name in development
    #[serde(default = "default_style_name")]
    pub style_name: String,

    /// Style bundle name in production
    #[serde(default = "default_style_name_production")]
    pub style_name_production: String,

    /// Globals document inside the templates source directory
    #[serde(default = "default_template_globals")]
    pub template_globals: String,

    /// Custom-property stylesheet inside the styles source directory,
    /// exposed to scripts as a virtual module
    #[serde(default = "default_style_variables")]
    pub style_variables: String,
}

impl FilesSection {
    /// Script naming template for the given mode.
    pub fn script_name_for(&self, mode: Mode) -> &str {
        match mode {
            Mode::Development => &self.script_name,
            Mode::Production => &self.script_name_production,
        }
    }

    /// Style naming template for the given mode.
    pub fn style_name_for(&self, mode: Mode) -> &str {
        match mode {
            Mode::Development => &self.style_name,
            Mode::Production => &self.style_name_production,
        }
    }
}

impl Default for FilesSection {
    fn default() -> Self {
        Self {
            script_entry: default_script_entry(),
            style_entry: default_style_entry(),
            script_name: default_script_name(),
            script_name_production: default_script_name_production(),
            style_name: default_style_name(),
            style_name_production: default_style_name_production(),
            template_globals: default_template_globals(),
            style_variables: default_style_variables(),
        }
    }
}

/// Feature toggles.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsSection {
    /// Render `*.j2` templates when true; pass `**/*.html` through the
    /// renderer when false
    #[serde(default = "default_true")]
    pub template_engine: bool,

    /// Inject bundle references relative to the markup file instead of
    /// absolute under the bundler's public path
    #[serde(default = "default_true")]
    pub inject_paths_relative: bool,

    /// Live-reload server options for the development watch loop
    #[serde(default)]
    pub livereload: LivereloadSettings,
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            template_engine: true,
            inject_paths_relative: true,
            livereload: LivereloadSettings::default(),
        }
    }
}

/// Live-reload server options.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LivereloadSettings {
    /// Serve the public tree with reload events during watch
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bind address
    #[serde(default = "default_livereload_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_livereload_port")]
    pub port: u16,
}

impl Default for LivereloadSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_livereload_host(),
            port: default_livereload_port(),
        }
    }
}

/// Options forwarded to the bundler adapter.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BundlerSection {
    /// Public URL prefix for emitted assets and injected references
    #[serde(default)]
    pub public_path: String,

    /// Target browser list, recorded in the bundle report
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,

    /// Window-provided libraries: import specifier to global name
    #[serde(default)]
    pub externals: BTreeMap<String, String>,

    /// Print a bundle summary and write report.json after production builds
    #[serde(default)]
    pub report: bool,

    /// List every emitted file after a build
    #[serde(default)]
    pub show_assets: bool,

    /// Maximum byte size for data-URI inlining of images and audio
    #[serde(default = "default_inline_limit")]
    pub inline_limit: u64,

    /// Build version string exposed through the build-constants module
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for BundlerSection {
    fn default() -> Self {
        Self {
            public_path: String::new(),
            browsers: default_browsers(),
            externals: BTreeMap::new(),
            report: false,
            show_assets: false,
            inline_limit: default_inline_limit(),
            version: default_version(),
        }
    }
}

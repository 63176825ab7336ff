//! Stylesheet processing through lightningcss.
//!
//! Intercepts `.css` loads so imported stylesheets enter the graph as
//! CSS modules. Production runs minify; development passes validated
//! source through unchanged apart from printing.

use std::borrow::Cow;
use std::path::Path;

use anyhow::Context;
use lightningcss::{
    printer::PrinterOptions,
    stylesheet::{MinifyOptions, ParserOptions, StyleSheet},
};
use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookUsage, Plugin, PluginContext,
};

#[derive(Debug, Clone)]
pub struct StylesPlugin {
    minify: bool,
}

impl StylesPlugin {
    pub fn new(minify: bool) -> Self {
        Self { minify }
    }
}

impl Plugin for StylesPlugin {
    fn name(&self) -> Cow<'static, str> {
        "kiln:styles".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Load
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let minify = self.minify;

        async move {
            if !id.ends_with(".css") {
                return Ok(None);
            }

            let source = tokio::fs::read_to_string(&id)
                .await
                .with_context(|| format!("failed to read stylesheet: {id}"))?;

            let before = source.len();
            let processed = process_css(Path::new(&id), &source, minify)?;
            tracing::debug!(
                stylesheet = %id,
                bytes_in = before,
                bytes_out = processed.len(),
                minify,
                "processed stylesheet"
            );

            Ok(Some(HookLoadOutput {
                code: processed.into(),
                module_type: Some(ModuleType::Css),
                ..Default::default()
            }))
        }
    }
}

fn process_css(path: &Path, source: &str, minify: bool) -> anyhow::Result<String> {
    let mut stylesheet = StyleSheet::parse(
        source,
        ParserOptions {
            filename: path.to_string_lossy().to_string(),
            ..Default::default()
        },
    )
    .map_err(|e| anyhow::anyhow!("failed to parse stylesheet {}: {:?}", path.display(), e))?;

    if minify {
        stylesheet
            .minify(MinifyOptions::default())
            .map_err(|e| anyhow::anyhow!("failed to minify stylesheet {}: {:?}", path.display(), e))?;
    }

    let result = stylesheet
        .to_css(PrinterOptions {
            minify,
            ..Default::default()
        })
        .map_err(|e| anyhow::anyhow!("failed to print stylesheet {}: {:?}", path.display(), e))?;

    Ok(result.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_valid_css_through() {
        let out = process_css(Path::new("test.css"), "body { color: red; }", false).unwrap();
        assert!(out.contains("color"));
    }

    #[test]
    fn minification_shrinks_output() {
        let css = "body {\n  color: red;\n  background: blue;\n}\n";
        let out = process_css(Path::new("test.css"), css, true).unwrap();
        assert!(out.len() < css.len());
        assert!(out.contains("color"));
    }

    #[test]
    fn custom_properties_survive_minification() {
        let css = ":root { --page-bg: #fff; }\nbody { background: var(--page-bg); }";
        let out = process_css(Path::new("test.css"), css, true).unwrap();
        assert!(out.contains("--page-bg"));
        assert!(out.contains("var(--page-bg)"));
    }

    #[test]
    fn parse_failure_names_the_file() {
        let err = process_css(Path::new("broken.css"), "body { color: ", false).unwrap_err();
        assert!(err.to_string().contains("broken.css"));
    }
}

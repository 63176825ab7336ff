//! Reference injection: point rendered markup at the written bundles.
//!
//! The final bundle file names live in the manifest the adapter wrote next
//! to the bundle (hashed in production, stable in development). Injection
//! rewrites every rendered HTML file in the temporary markup tree to
//! reference them, replacing `<!-- kiln:css -->` / `<!-- kiln:js -->`
//! markers when present and otherwise inserting before `</head>` /
//! `</body>`. Production additionally minifies the markup.

use std::path::Path;

use kiln_bundler::BundleManifest;
use kiln_config::{BuildContext, PathRole};
use walkdir::WalkDir;

use crate::error::{CliError, Result, ResultExt};

const CSS_MARKER: &str = "<!-- kiln:css -->";
const JS_MARKER: &str = "<!-- kiln:js -->";

/// Rewrite rendered markup to reference the current bundle files.
pub async fn inject_references(ctx: &BuildContext) -> Result<()> {
    let markup_dir = ctx.path(PathRole::TemplatesTemp)?;
    if !markup_dir.is_dir() {
        tracing::debug!("no rendered markup to inject into");
        return Ok(());
    }
    let manifest = BundleManifest::read_from(ctx.path(PathRole::AssetsTemp)?)
        .with_hint("Assets must compile before references can be injected")?;
    let minify = ctx.mode().is_production();

    let mut injected = 0;
    for entry in WalkDir::new(markup_dir) {
        let entry = entry.map_err(|e| {
            CliError::Custom(format!("Failed to walk '{}': {e}", markup_dir.display()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(markup_dir) else {
            continue;
        };
        if rel.extension().is_none_or(|ext| ext != "html") {
            continue;
        }

        let source = tokio::fs::read_to_string(entry.path()).await?;
        let style_url = match &manifest.style {
            Some(style) => Some(reference_url(ctx, rel, style)?),
            None => None,
        };
        let script_url = reference_url(ctx, rel, &manifest.script)?;

        let mut html = inject_into(&source, style_url.as_deref(), &script_url);
        if minify {
            html = minify_html(&html);
        }
        tokio::fs::write(entry.path(), html).await?;
        tracing::debug!(file = %rel.display(), "references injected");
        injected += 1;
    }

    tracing::info!(files = injected, "references injected");
    Ok(())
}

/// The URL a markup file at `rel_markup` uses to reach `file_name` in the
/// published assets directory.
///
/// Relative references climb from the markup file's published location to
/// the public root and descend into the assets directory; absolute
/// references prepend the bundler's public path.
fn reference_url(ctx: &BuildContext, rel_markup: &Path, file_name: &str) -> Result<String> {
    if !ctx.config().settings.inject_paths_relative {
        return Ok(format!(
            "{}{file_name}",
            ctx.config().bundler.public_path
        ));
    }

    let public = ctx.path(PathRole::Public)?;
    let assets = ctx.path(PathRole::AssetsResult)?;
    let markup_root = ctx.path(PathRole::TemplatesResult)?;

    let assets_rel = assets.strip_prefix(public).unwrap_or(assets);
    let markup_rel = markup_root.strip_prefix(public).unwrap_or(Path::new(""));

    let mut depth = markup_rel.components().count();
    if let Some(parent) = rel_markup.parent() {
        depth += parent.components().count();
    }

    let mut url = "../".repeat(depth);
    for component in assets_rel.components() {
        url.push_str(&component.as_os_str().to_string_lossy());
        url.push('/');
    }
    url.push_str(file_name);
    Ok(url)
}

/// Place the style and script references into the markup.
fn inject_into(source: &str, style_url: Option<&str>, script_url: &str) -> String {
    let mut html = source.to_string();
    if let Some(url) = style_url {
        let tag = format!("<link rel=\"stylesheet\" href=\"{url}\">");
        html = replace_or_insert(&html, CSS_MARKER, &tag, "</head>");
    } else if html.contains(CSS_MARKER) {
        html = html.replace(CSS_MARKER, "");
    }

    let tag = format!("<script src=\"{script_url}\"></script>");
    replace_or_insert(&html, JS_MARKER, &tag, "</body>")
}

/// Replace every `marker` with `tag`; with no marker, insert `tag` before
/// `anchor`, appending at the end when the anchor is missing too.
fn replace_or_insert(html: &str, marker: &str, tag: &str, anchor: &str) -> String {
    if html.contains(marker) {
        return html.replace(marker, tag);
    }
    if let Some(pos) = html.find(anchor) {
        let mut out = String::with_capacity(html.len() + tag.len() + 1);
        out.push_str(&html[..pos]);
        out.push_str(tag);
        out.push('\n');
        out.push_str(&html[pos..]);
        return out;
    }
    format!("{html}\n{tag}\n")
}

/// Tags whose text content survives minification untouched.
const PRESERVED_ELEMENTS: [&[u8]; 4] = [b"pre", b"script", b"style", b"textarea"];

/// Collapse inter-tag whitespace and strip HTML comments.
///
/// Conditional comments and the content of `<pre>`, `<script>`, `<style>`,
/// and `<textarea>` elements pass through verbatim. Whitespace runs inside
/// text collapse to a single space; runs sitting directly between tags are
/// dropped.
fn minify_html(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i..].starts_with(b"<!--") {
            if bytes[i..].starts_with(b"<!--[if") {
                // Conditional comment: copy it whole.
                let end = find_from(bytes, i + 4, b"-->").map_or(bytes.len(), |p| p + 3);
                out.extend_from_slice(&bytes[i..end]);
                i = end;
            } else {
                match find_from(bytes, i + 4, b"-->") {
                    Some(end) => i = end + 3,
                    None => break,
                }
            }
            continue;
        }

        if bytes[i] == b'<' {
            if let Some(end) = preserved_region_end(bytes, i) {
                out.extend_from_slice(&bytes[i..end]);
                i = end;
            } else {
                let end = tag_end(bytes, i);
                out.extend_from_slice(&bytes[i..end]);
                i = end;
            }
            continue;
        }

        if bytes[i].is_ascii_whitespace() {
            let mut j = i;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let between_tags = out.last() == Some(&b'>') && bytes.get(j) == Some(&b'<');
            if !between_tags && !out.is_empty() && j < bytes.len() {
                out.push(b' ');
            }
            i = j;
            continue;
        }

        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).unwrap_or_else(|_| source.to_string())
}

/// End (exclusive) of the preserved element starting at `i`, if one does.
fn preserved_region_end(bytes: &[u8], i: usize) -> Option<usize> {
    for name in PRESERVED_ELEMENTS {
        let open_len = 1 + name.len();
        if bytes.len() < i + open_len + 1 || !starts_with_ci(&bytes[i + 1..], name) {
            continue;
        }
        // Must be a real tag open: `<pre>`, `<pre `, `<pre/>` - not `<premium>`.
        match bytes.get(i + open_len) {
            Some(c) if *c == b'>' || *c == b'/' || c.is_ascii_whitespace() => {}
            _ => continue,
        }

        let mut close = Vec::with_capacity(name.len() + 2);
        close.extend_from_slice(b"</");
        close.extend_from_slice(name);
        let close_at = find_ci_from(bytes, i + open_len, &close)?;
        let end = find_from(bytes, close_at, b">").map_or(bytes.len(), |p| p + 1);
        return Some(end);
    }
    None
}

/// End (exclusive) of the tag starting at `i`, honoring quoted attributes.
fn tag_end(bytes: &[u8], i: usize) -> usize {
    let mut j = i;
    let mut quote: Option<u8> = None;
    while j < bytes.len() {
        match (quote, bytes[j]) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(bytes[j]),
            (None, b'>') => return j + 1,
            (None, _) => {}
        }
        j += 1;
    }
    bytes.len()
}

fn find_from(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| from + pos)
}

/// Case-insensitive variant of [`find_from`] for ASCII needles.
fn find_ci_from(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|pos| from + pos)
}

fn starts_with_ci(haystack: &[u8], prefix: &[u8]) -> bool {
    haystack.len() >= prefix.len() && haystack[..prefix.len()].eq_ignore_ascii_case(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use kiln_config::{KilnConfig, Mode};

    fn context_at(root: &Path, mode: Mode, mutate: impl FnOnce(&mut KilnConfig)) -> BuildContext {
        let mut config = KilnConfig::default();
        config.paths.root = root.to_string_lossy().into_owned();
        mutate(&mut config);
        BuildContext::new(mode, Arc::new(config))
    }

    fn write_manifest(ctx: &BuildContext, script: &str, style: Option<&str>) {
        let assets_temp = ctx.path(PathRole::AssetsTemp).unwrap();
        fs::create_dir_all(assets_temp).unwrap();
        let manifest = BundleManifest {
            script: script.to_string(),
            style: style.map(|s| s.to_string()),
            assets: Vec::new(),
            mode: ctx.mode(),
            duration_ms: 0,
        };
        manifest.write_to(assets_temp).unwrap();
    }

    #[tokio::test]
    async fn markers_are_replaced_with_references() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_at(dir.path(), Mode::Development, |_| {});
        write_manifest(&ctx, "bundle.js", Some("bundle.css"));

        let markup = ctx.path(PathRole::TemplatesTemp).unwrap().to_path_buf();
        fs::create_dir_all(&markup).unwrap();
        fs::write(
            markup.join("index.html"),
            "<head><!-- kiln:css --></head><body><!-- kiln:js --></body>",
        )
        .unwrap();

        inject_references(&ctx).await.unwrap();

        let html = fs::read_to_string(markup.join("index.html")).unwrap();
        assert!(html.contains("<link rel=\"stylesheet\" href=\"assets/bundle.css\">"));
        assert!(html.contains("<script src=\"assets/bundle.js\"></script>"));
        assert!(!html.contains("kiln:css"));
    }

    #[tokio::test]
    async fn missing_markers_fall_back_to_head_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_at(dir.path(), Mode::Development, |_| {});
        write_manifest(&ctx, "bundle.js", Some("bundle.css"));

        let markup = ctx.path(PathRole::TemplatesTemp).unwrap().to_path_buf();
        fs::create_dir_all(&markup).unwrap();
        fs::write(
            markup.join("index.html"),
            "<html><head><title>t</title></head><body><p>x</p></body></html>",
        )
        .unwrap();

        inject_references(&ctx).await.unwrap();

        let html = fs::read_to_string(markup.join("index.html")).unwrap();
        let link_at = html.find("<link rel=\"stylesheet\"").unwrap();
        let head_close = html.find("</head>").unwrap();
        let script_at = html.find("<script src=").unwrap();
        let body_close = html.find("</body>").unwrap();
        assert!(link_at < head_close);
        assert!(script_at < body_close);
    }

    #[tokio::test]
    async fn nested_markup_climbs_to_the_assets_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_at(dir.path(), Mode::Development, |_| {});
        write_manifest(&ctx, "bundle.js", None);

        let markup = ctx.path(PathRole::TemplatesTemp).unwrap().to_path_buf();
        fs::create_dir_all(markup.join("sub")).unwrap();
        fs::write(markup.join("sub/page.html"), "<body></body>").unwrap();

        inject_references(&ctx).await.unwrap();

        let html = fs::read_to_string(markup.join("sub/page.html")).unwrap();
        assert!(html.contains("src=\"../assets/bundle.js\""));
    }

    #[tokio::test]
    async fn markup_directory_adds_a_level_to_relative_references() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_at(dir.path(), Mode::Development, |c| {
            c.dirs.html = "pages".to_string();
        });
        write_manifest(&ctx, "bundle.js", None);

        let markup = ctx.path(PathRole::TemplatesTemp).unwrap().to_path_buf();
        fs::create_dir_all(&markup).unwrap();
        fs::write(markup.join("index.html"), "<body></body>").unwrap();

        inject_references(&ctx).await.unwrap();

        let html = fs::read_to_string(markup.join("index.html")).unwrap();
        assert!(html.contains("src=\"../assets/bundle.js\""));
    }

    #[tokio::test]
    async fn absolute_references_use_the_public_path() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_at(dir.path(), Mode::Development, |c| {
            c.settings.inject_paths_relative = false;
            c.bundler.public_path = "/static/".to_string();
        });
        write_manifest(&ctx, "bundle.js", Some("bundle.css"));

        let markup = ctx.path(PathRole::TemplatesTemp).unwrap().to_path_buf();
        fs::create_dir_all(&markup).unwrap();
        fs::write(markup.join("index.html"), "<head></head><body></body>").unwrap();

        inject_references(&ctx).await.unwrap();

        let html = fs::read_to_string(markup.join("index.html")).unwrap();
        assert!(html.contains("href=\"/static/bundle.css\""));
        assert!(html.contains("src=\"/static/bundle.js\""));
    }

    #[tokio::test]
    async fn production_minifies_the_markup() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_at(dir.path(), Mode::Production, |_| {});
        write_manifest(&ctx, "bundle.abc12345.min.js", None);

        let markup = ctx.path(PathRole::TemplatesTemp).unwrap().to_path_buf();
        fs::create_dir_all(&markup).unwrap();
        fs::write(
            markup.join("index.html"),
            "<body>\n  <!-- remove me -->\n  <p>kept</p>\n</body>",
        )
        .unwrap();

        inject_references(&ctx).await.unwrap();

        let html = fs::read_to_string(markup.join("index.html")).unwrap();
        assert!(!html.contains("remove me"));
        assert!(html.contains("<body><p>kept</p>"));
    }

    #[test]
    fn style_marker_vanishes_when_no_stylesheet_was_emitted() {
        let html = inject_into(
            "<head><!-- kiln:css --></head><body><!-- kiln:js --></body>",
            None,
            "bundle.js",
        );
        assert!(!html.contains("kiln:css"));
        assert!(!html.contains("<link"));
        assert!(html.contains("<script src=\"bundle.js\"></script>"));
    }

    #[test]
    fn without_anchors_the_reference_is_appended() {
        let html = inject_into("<p>fragment</p>", None, "bundle.js");
        assert!(html.ends_with("<script src=\"bundle.js\"></script>\n"));
    }

    #[test]
    fn minify_collapses_inter_tag_whitespace() {
        let html = "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>";
        assert_eq!(minify_html(html), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn minify_collapses_text_whitespace_to_one_space() {
        assert_eq!(minify_html("<p>hello   \n  world</p>"), "<p>hello world</p>");
    }

    #[test]
    fn minify_strips_comments_but_keeps_conditionals() {
        let html = "<p>a</p><!-- gone --><!--[if IE]><link href=\"ie.css\"><![endif]--><p>b</p>";
        let out = minify_html(html);
        assert!(!out.contains("gone"));
        assert!(out.contains("<!--[if IE]>"));
        assert!(out.contains("<![endif]-->"));
    }

    #[test]
    fn minify_preserves_pre_and_script_content() {
        let html = "<pre>\n  two\n   spaces</pre><script>\nlet a = 1;\n</script>";
        let out = minify_html(html);
        assert!(out.contains("<pre>\n  two\n   spaces</pre>"));
        assert!(out.contains("<script>\nlet a = 1;\n</script>"));
    }

    #[test]
    fn minify_keeps_quoted_angle_brackets_in_attributes() {
        let html = "<img alt=\"a > b\" src=\"x.png\">";
        assert_eq!(minify_html(html), html);
    }

    #[test]
    fn minify_does_not_mistake_prefixed_tags_for_preserved_ones() {
        let html = "<presentation>\n  text\n</presentation>";
        assert_eq!(minify_html(html), "<presentation> text </presentation>");
    }
}

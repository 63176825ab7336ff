//! Full pipeline runs against a real site fixture on disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use kiln_bundler::BundlerAdapter;
use kiln_cli::pipeline;
use kiln_config::{BuildContext, KilnConfig, Mode, PathRole};

fn context(root: &Path, mode: Mode) -> BuildContext {
    let mut config = KilnConfig::default();
    config.paths.root = root.to_string_lossy().into_owned();
    BuildContext::new(mode, Arc::new(config))
}

/// Lay down a small site: a script with one import, a stylesheet, one
/// template with injection markers, and the globals document.
fn write_site(root: &Path) {
    fs::create_dir_all(root.join("src/js")).unwrap();
    fs::create_dir_all(root.join("src/css")).unwrap();
    fs::create_dir_all(root.join("src/templates")).unwrap();

    fs::write(
        root.join("src/js/main.js"),
        "import { greet } from './greet.js';\nconsole.log(greet('kiln'));\n",
    )
    .unwrap();
    fs::write(
        root.join("src/js/greet.js"),
        "export function greet(name) { return 'hello ' + name; }\n",
    )
    .unwrap();
    fs::write(
        root.join("src/css/main.css"),
        "body { color: #ff0000; margin: 0; }\n",
    )
    .unwrap();

    fs::write(
        root.join("src/templates/index.j2"),
        concat!(
            "<html><head><title>{{ title }}</title><!-- kiln:css --></head>",
            "<body><!-- keep --><h1>{{ title }}</h1><!-- kiln:js --></body></html>",
        ),
    )
    .unwrap();
    fs::write(root.join("src/templates/globals.json"), "{\"title\": \"Kiln\"}").unwrap();
}

fn files_matching(dir: &Path, prefix: &str, suffix: &str) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(prefix) && name.ends_with(suffix))
        .collect();
    names.sort();
    names
}

#[tokio::test(flavor = "multi_thread")]
async fn production_build_publishes_a_complete_site() {
    let dir = tempfile::tempdir().unwrap();
    write_site(dir.path());
    let ctx = context(dir.path(), Mode::Production);

    pipeline::production(Arc::new(BundlerAdapter::new()))
        .run(&ctx)
        .await
        .unwrap();

    let assets = ctx.path(PathRole::AssetsResult).unwrap();
    let scripts = files_matching(assets, "bundle.", ".min.js");
    let styles = files_matching(assets, "bundle.", ".min.css");
    assert_eq!(scripts.len(), 1, "expected one hashed script, got {scripts:?}");
    assert_eq!(styles.len(), 1, "expected one hashed stylesheet, got {styles:?}");

    let script = fs::read_to_string(assets.join(&scripts[0])).unwrap();
    assert!(script.contains("hello"));

    let html =
        fs::read_to_string(ctx.path(PathRole::Public).unwrap().join("index.html")).unwrap();
    assert!(html.contains("<h1>Kiln</h1>"));
    assert!(html.contains(&format!("assets/{}", scripts[0])));
    assert!(html.contains(&format!("assets/{}", styles[0])));
    // Production markup is minified: comments gone.
    assert!(!html.contains("<!-- keep -->"));
}

#[tokio::test(flavor = "multi_thread")]
async fn development_build_uses_stable_names_and_keeps_markup_readable() {
    let dir = tempfile::tempdir().unwrap();
    write_site(dir.path());
    let ctx = context(dir.path(), Mode::Development);

    pipeline::development(Arc::new(BundlerAdapter::new()))
        .run(&ctx)
        .await
        .unwrap();

    let assets = ctx.path(PathRole::AssetsResult).unwrap();
    assert!(assets.join("bundle.js").is_file());
    assert!(assets.join("bundle.css").is_file());

    let html =
        fs::read_to_string(ctx.path(PathRole::Public).unwrap().join("index.html")).unwrap();
    assert!(html.contains("assets/bundle.js"));
    assert!(html.contains("assets/bundle.css"));
    assert!(html.contains("<!-- keep -->"));
    assert!(!html.contains("kiln:js"));
}

#[tokio::test(flavor = "multi_thread")]
async fn rebuilding_replaces_the_published_output() {
    let dir = tempfile::tempdir().unwrap();
    write_site(dir.path());
    let ctx = context(dir.path(), Mode::Development);
    let pipeline = pipeline::development(Arc::new(BundlerAdapter::new()));

    pipeline.run(&ctx).await.unwrap();

    // A stale artifact from a previous run disappears on the next build.
    let assets = ctx.path(PathRole::AssetsResult).unwrap().to_path_buf();
    fs::write(assets.join("stale.js"), "leftover").unwrap();

    pipeline.run(&ctx).await.unwrap();
    assert!(!assets.join("stale.js").exists());
    assert!(assets.join("bundle.js").is_file());
}

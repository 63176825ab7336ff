//! Default values for the configuration document.

pub(crate) fn default_root() -> String {
    "./".to_string()
}

pub(crate) fn default_sources() -> String {
    "src/".to_string()
}

pub(crate) fn default_results() -> String {
    "public/".to_string()
}

pub(crate) fn default_temp() -> String {
    "temp/".to_string()
}

pub(crate) fn default_assets_dir() -> String {
    "assets/".to_string()
}

pub(crate) fn default_css_dir() -> String {
    "css/".to_string()
}

pub(crate) fn default_js_dir() -> String {
    "js/".to_string()
}

pub(crate) fn default_vendors_dir() -> String {
    "vendors/".to_string()
}

pub(crate) fn default_img_dir() -> String {
    "img/".to_string()
}

pub(crate) fn default_templates_dir() -> String {
    "templates/".to_string()
}

pub(crate) fn default_script_entry() -> String {
    "main.js".to_string()
}

pub(crate) fn default_style_entry() -> String {
    "main.css".to_string()
}

pub(crate) fn default_script_name() -> String {
    "bundle.js".to_string()
}

pub(crate) fn default_script_name_production() -> String {
    "bundle.[hash].min.js".to_string()
}

pub(crate) fn default_style_name() -> String {
    "bundle.css".to_string()
}

pub(crate) fn default_style_name_production() -> String {
    "bundle.[hash].min.css".to_string()
}

pub(crate) fn default_template_globals() -> String {
    "globals.json".to_string()
}

pub(crate) fn default_style_variables() -> String {
    "variables.css".to_string()
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_livereload_host() -> String {
    "127.0.0.1".to_string()
}

pub(crate) fn default_livereload_port() -> u16 {
    // Conventional live-reload port.
    35729
}

pub(crate) fn default_browsers() -> Vec<String> {
    vec![
        "> 0.5%".to_string(),
        "last 2 versions".to_string(),
        "not dead".to_string(),
    ]
}

pub(crate) fn default_inline_limit() -> u64 {
    10_000
}

pub(crate) fn default_version() -> String {
    "0.0.0".to_string()
}

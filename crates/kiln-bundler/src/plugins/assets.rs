//! Binary asset rules for the module graph.
//!
//! Imports of images and audio become data URIs when the file is at or
//! under the inline limit, and hashed copies in the bundle output
//! directory otherwise. Fonts are always copied (base64 font payloads
//! bloat stylesheets). Template partials imported with a `.j2` suffix
//! become raw string modules.
//!
//! Copied files are recorded in a shared [`AssetRegistry`] so the writer
//! can list them in the manifest and keep them during cleanup.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use base64::Engine as _;
use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookUsage, Plugin, PluginContext,
};

use crate::generated::GeneratedConfig;

/// One file copied into the bundle output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedAsset {
    /// Hashed file name under the output directory
    pub file_name: String,
    /// Path of the source file the copy was made from
    pub source_path: PathBuf,
    pub bytes: u64,
}

/// Shared record of assets copied during one compilation.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    files: parking_lot::Mutex<Vec<CapturedAsset>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, asset: CapturedAsset) {
        let mut files = self.files.lock();
        if !files.iter().any(|f| f.file_name == asset.file_name) {
            files.push(asset);
        }
    }

    /// Drain the records accumulated since the last call.
    pub fn take(&self) -> Vec<CapturedAsset> {
        std::mem::take(&mut self.files.lock())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetKind {
    /// Inlined when small enough: images and audio
    Inlineable,
    /// Always copied: fonts
    Copied,
    /// Embedded as a raw string module: template partials
    RawText,
}

/// Applies the asset rules in the load phase, before the default loader
/// would choke on binary content.
#[derive(Debug)]
pub struct AssetRulesPlugin {
    out_dir: PathBuf,
    public_path: String,
    inline_limit: u64,
    registry: Arc<AssetRegistry>,
}

impl AssetRulesPlugin {
    pub fn new(config: &GeneratedConfig, registry: Arc<AssetRegistry>) -> Self {
        Self {
            out_dir: config.out_dir.clone(),
            public_path: config.public_path.clone(),
            inline_limit: config.inline_limit,
            registry,
        }
    }
}

impl Plugin for AssetRulesPlugin {
    fn name(&self) -> Cow<'static, str> {
        "kiln:asset-rules".into()
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
        let out_dir = self.out_dir.clone();
        let public_path = self.public_path.clone();
        let inline_limit = self.inline_limit;
        let registry = Arc::clone(&self.registry);

        async move {
            let Some(kind) = asset_kind(&id) else {
                return Ok(None);
            };

            if kind == AssetKind::RawText {
                let source = tokio::fs::read_to_string(&id)
                    .await
                    .with_context(|| format!("failed to read template partial: {id}"))?;
                let literal = serde_json::to_string(&source)
                    .with_context(|| format!("failed to embed template partial: {id}"))?;
                return Ok(Some(HookLoadOutput {
                    code: format!("export default {literal};\n").into(),
                    module_type: Some(ModuleType::Js),
                    ..Default::default()
                }));
            }

            let bytes = tokio::fs::read(&id)
                .await
                .with_context(|| format!("failed to read asset: {id}"))?;

            let url = if kind == AssetKind::Inlineable && bytes.len() as u64 <= inline_limit {
                data_uri(&id, &bytes)
            } else {
                let file_name = hashed_name(&id, &bytes);
                let target = out_dir.join(&file_name);
                tokio::fs::create_dir_all(&out_dir)
                    .await
                    .with_context(|| format!("failed to create {}", out_dir.display()))?;
                tokio::fs::write(&target, &bytes)
                    .await
                    .with_context(|| format!("failed to copy asset to {}", target.display()))?;
                registry.record(CapturedAsset {
                    file_name: file_name.clone(),
                    source_path: PathBuf::from(&id),
                    bytes: bytes.len() as u64,
                });
                format!("{public_path}{file_name}")
            };

            Ok(Some(HookLoadOutput {
                code: format!("export default {:?};\n", url).into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }))
        }
    }
}

fn asset_kind(id: &str) -> Option<AssetKind> {
    let ext = Path::new(id).extension()?.to_str()?;
    match ext.to_ascii_lowercase().as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "ico" | "mp3" | "ogg" | "wav" => {
            Some(AssetKind::Inlineable)
        }
        "woff" | "woff2" | "ttf" | "eot" | "otf" => Some(AssetKind::Copied),
        "j2" => Some(AssetKind::RawText),
        _ => None,
    }
}

fn mime_for(id: &str) -> &'static str {
    let ext = Path::new(id)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}

fn data_uri(id: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{}", mime_for(id), encoded)
}

/// `logo.png` with content `abc...` becomes `logo.3a985da7.png`.
fn hashed_name(id: &str, bytes: &[u8]) -> String {
    let path = Path::new(id);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("asset");
    let hash = blake3::hash(bytes).to_hex();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}.{}.{ext}", &hash.as_str()[..8]),
        None => format!("{stem}.{}", &hash.as_str()[..8]),
    }
}

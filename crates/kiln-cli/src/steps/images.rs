//! Image compression: stage changed images into the temporary tree.
//!
//! Only images newer than their existing temp copies are touched; the mtime
//! check makes watch-driven recompression cheap. Development copies bytes
//! untouched. Production re-encodes raster formats through the `image` crate
//! (PNG at best compression, JPEG at a fixed quality, GIF frame-preserving)
//! and minifies SVG text; anything else copies as-is.

use std::fs;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{AnimationDecoder as _, ColorType, ImageEncoder as _};
use kiln_config::{BuildContext, Mode, PathRole};
use walkdir::WalkDir;

use crate::error::{CliError, Result};

const JPEG_QUALITY: u8 = 80;

/// Counts of images copied vs skipped by the mtime check.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompressionReport {
    pub copied: usize,
    pub skipped: usize,
}

/// Stage the image sources into the temporary image directory.
pub async fn compress_images(ctx: &BuildContext) -> Result<CompressionReport> {
    let source = ctx.path(PathRole::ImagesSource)?;
    if !source.is_dir() {
        tracing::debug!(path = %source.display(), "no image sources");
        return Ok(CompressionReport::default());
    }
    let dest = ctx.path(PathRole::ImagesTemp)?;

    let report = compress_tree(source, dest, ctx.mode())?;
    tracing::info!(
        copied = report.copied,
        skipped = report.skipped,
        "images staged"
    );
    Ok(report)
}

/// Walk `source` and stage every image file into `dest`.
fn compress_tree(source: &Path, dest: &Path, mode: Mode) -> Result<CompressionReport> {
    let mut report = CompressionReport::default();

    for entry in WalkDir::new(source) {
        let entry = entry
            .map_err(|e| CliError::Custom(format!("Failed to walk '{}': {e}", source.display())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(source) else {
            continue;
        };

        let target = dest.join(rel);
        if is_up_to_date(entry.path(), &target)? {
            report.skipped += 1;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        match mode {
            Mode::Development => {
                fs::copy(entry.path(), &target)?;
            }
            Mode::Production => compress_file(entry.path(), &target)?,
        }
        tracing::debug!(image = %rel.display(), "image staged");
        report.copied += 1;
    }

    Ok(report)
}

/// A target is up to date when it exists and is at least as new as its source.
fn is_up_to_date(source: &Path, target: &Path) -> Result<bool> {
    let Ok(target_meta) = fs::metadata(target) else {
        return Ok(false);
    };
    let source_mtime = fs::metadata(source)?.modified()?;
    let target_mtime = target_meta.modified()?;
    Ok(target_mtime >= source_mtime)
}

fn compress_file(source: &Path, target: &Path) -> Result<()> {
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => reencode_png(source, target),
        "jpg" | "jpeg" => reencode_jpeg(source, target),
        "gif" => reencode_gif(source, target),
        "svg" => minify_svg_file(source, target),
        _ => {
            fs::copy(source, target)?;
            Ok(())
        }
    }
}

fn reencode_png(source: &Path, target: &Path) -> Result<()> {
    let img = image::open(source).map_err(|error| image_error(source, error))?;
    let rgba = img.to_rgba8();

    let file = fs::File::create(target)?;
    let encoder = BufWriter::new(file);
    PngEncoder::new_with_quality(encoder, CompressionType::Best, FilterType::Adaptive)
        .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)
        .map_err(|error| image_error(source, error))?;
    Ok(())
}

fn reencode_jpeg(source: &Path, target: &Path) -> Result<()> {
    let img = image::open(source).map_err(|error| image_error(source, error))?;
    let rgb = img.to_rgb8();

    let file = fs::File::create(target)?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|error| image_error(source, error))?;
    Ok(())
}

/// GIF re-encode keeps every frame so animations survive.
fn reencode_gif(source: &Path, target: &Path) -> Result<()> {
    let input = fs::File::open(source)?;
    let decoder =
        GifDecoder::new(std::io::BufReader::new(input)).map_err(|e| image_error(source, e))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| image_error(source, e))?;

    let output = fs::File::create(target)?;
    let mut encoder = GifEncoder::new(BufWriter::new(output));
    encoder
        .set_repeat(Repeat::Infinite)
        .map_err(|e| image_error(source, e))?;
    encoder
        .encode_frames(frames)
        .map_err(|e| image_error(source, e))?;
    Ok(())
}

fn minify_svg_file(source: &Path, target: &Path) -> Result<()> {
    let text = fs::read_to_string(source)?;
    fs::write(target, minify_svg(&text))?;
    Ok(())
}

/// Strip XML comments and collapse whitespace runs. Runs sitting directly
/// between tags are dropped entirely, everything else collapses to one space.
fn minify_svg(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i..].starts_with(b"<!--") {
            match find_from(bytes, i + 4, b"-->") {
                Some(end) => {
                    i = end + 3;
                    continue;
                }
                None => break,
            }
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

fn find_from(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| from + pos)
}

fn image_error(path: &Path, error: image::ImageError) -> CliError {
    CliError::Image {
        path: path.to_path_buf(),
        error,
    }
}

//! Attachment image validation and downscaling
//!
//! Uploads are checked against an allow-list of image types and a size cap,
//! then scaled down to fit a square bound (aspect ratio preserved, never
//! upscaled) and re-encoded in the source format.

use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use tracing::debug;

use crate::inbox::InboxError;

/// An image ready to be stored
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Lowercase file extension without the dot
    pub extension: String,
    pub width: u32,
    pub height: u32,
    pub resized: bool,
}

fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Accepted attachment types
fn format_for(content_type: &str) -> Option<ImageFormat> {
    match content_type {
        "image/jpeg" => Some(ImageFormat::Jpeg),
        "image/png" => Some(ImageFormat::Png),
        "image/gif" => Some(ImageFormat::Gif),
        "image/webp" => Some(ImageFormat::WebP),
        _ => None,
    }
}

/// Human-readable byte count: "0 Bytes", "512 Bytes", "1.5 KB", "5 MB"
pub fn format_file_size(bytes: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Dimensions that fit `(width, height)` inside `max × max`
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }

    let (mut w, mut h) = (f64::from(width), f64::from(height));
    let max = f64::from(max);
    if w > max {
        h = h * max / w;
        w = max;
    }
    if h > max {
        w = w * max / h;
        h = max;
    }
    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}

/// Extension from the uploaded file name, falling back to the format's default
fn extension_for(file_name: &str, format: ImageFormat) -> String {
    let from_name = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.unwrap_or_else(|| {
        format
            .extensions_str()
            .first()
            .copied()
            .unwrap_or("bin")
            .to_string()
    })
}

/// Validate and downscale an uploaded image
pub fn prepare_upload(
    bytes: &[u8],
    content_type: &str,
    file_name: &str,
    max_bytes: usize,
    max_dimension: u32,
) -> Result<PreparedImage, InboxError> {
    let content_type = normalize_content_type(content_type);
    let format = format_for(&content_type)
        .ok_or_else(|| InboxError::UnsupportedImageType(content_type.clone()))?;

    if bytes.len() > max_bytes {
        return Err(InboxError::UploadTooLarge {
            size: format_file_size(bytes.len()),
            max: format_file_size(max_bytes),
        });
    }

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| InboxError::ImageDecode(e.to_string()))?;
    let (width, height) = img.dimensions();
    let (target_w, target_h) = fit_within(width, height, max_dimension);
    let extension = extension_for(file_name, format);

    if (target_w, target_h) == (width, height) {
        return Ok(PreparedImage {
            bytes: bytes.to_vec(),
            content_type,
            extension,
            width,
            height,
            resized: false,
        });
    }

    let resized = img.resize_exact(target_w, target_h, FilterType::Triangle);
    // JPEG has no alpha channel; WebP encoding wants 8-bit RGBA
    let resized = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()),
        ImageFormat::WebP | ImageFormat::Gif => DynamicImage::ImageRgba8(resized.to_rgba8()),
        _ => resized,
    };

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, format)
        .map_err(|e| InboxError::ImageDecode(format!("Re-encode failed: {}", e)))?;

    debug!(
        "Resized attachment {}x{} -> {}x{} ({} -> {})",
        width,
        height,
        target_w,
        target_h,
        format_file_size(bytes.len()),
        format_file_size(out.get_ref().len())
    );

    Ok(PreparedImage {
        bytes: out.into_inner(),
        content_type,
        extension,
        width: target_w,
        height: target_h,
        resized: true,
    })
}

//! Image encoding: RGB raster → base64 JPEG data URI.
//!
//! Documents store the image inline, so the output is a complete
//! `data:image/jpeg;base64,...` string that any browser can render directly.
//! JPEG has no alpha channel; rasters are flattened to RGB8 once, before the
//! compression loop, and every attempt re-encodes that same buffer.

use crate::config::Quality;
use crate::output::OUTPUT_MIME;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage};
use tracing::debug;

/// Flatten any decoded raster to the RGB8 buffer the encoder consumes.
pub fn to_encodable(img: DynamicImage) -> RgbImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    }
}

/// Encode `raster` as JPEG at `quality` and wrap it in a data URI.
pub fn encode_data_uri(raster: &RgbImage, quality: Quality) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.percent()).write_image(
        raster.as_raw(),
        raster.width(),
        raster.height(),
        ExtendedColorType::Rgb8,
    )?;

    let prefix = data_uri_prefix();
    let mut uri = String::with_capacity(prefix.len() + buf.len().div_ceil(3) * 4);
    uri.push_str(&prefix);
    STANDARD.encode_string(&buf, &mut uri);
    debug!(
        "Encoded JPEG q={} → {} bytes, {} chars as data URI",
        quality,
        buf.len(),
        uri.len()
    );

    Ok(uri)
}

/// `data:image/jpeg;base64,`
pub fn data_uri_prefix() -> String {
    format!("data:{OUTPUT_MIME};base64,")
}

/// Split a data URI into its MIME type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime.to_string(), bytes))
}

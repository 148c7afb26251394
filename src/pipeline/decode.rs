//! Decode: image bytes → `DynamicImage`.
//!
//! Runs on the blocking pool (called from [`crate::preprocess`]) because
//! decoding a 12-megapixel JPEG takes tens of milliseconds of pure CPU.
//! The format is guessed from magic bytes; the declared MIME type of the
//! input is not consulted.

use crate::error::PreprocessError;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// Decode the full raster.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, PreprocessError> {
    if bytes.is_empty() {
        return Err(PreprocessError::Decode {
            detail: "input is empty".into(),
        });
    }

    let img = reader(bytes)?
        .decode()
        .map_err(|e| PreprocessError::Decode {
            detail: e.to_string(),
        })?;

    debug!("Decoded image → {}x{} px", img.width(), img.height());
    Ok(img)
}

/// Read only the header and return `(width, height)`.
pub fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32), PreprocessError> {
    reader(bytes)?
        .into_dimensions()
        .map_err(|e| PreprocessError::Decode {
            detail: e.to_string(),
        })
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, PreprocessError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PreprocessError::Decode {
            detail: e.to_string(),
        })
}

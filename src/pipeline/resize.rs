//! Resize: cap the longer side of a raster at `max_dimension`.
//!
//! The longer side becomes exactly `max_dimension`; the shorter side is
//! scaled by the same factor and rounded half-up, never below 1 px. Rasters
//! already within the limit are returned untouched.

use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

/// Dimensions after capping the longer side at `max_dimension`.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }

    let (long, short) = if width >= height {
        (width, height)
    } else {
        (height, width)
    };
    let max = u64::from(max_dimension);
    let scaled = (u64::from(short) * max + u64::from(long) / 2) / u64::from(long);
    let scaled = (scaled as u32).max(1);

    if width >= height {
        (max_dimension, scaled)
    } else {
        (scaled, max_dimension)
    }
}

/// Downscale `img` if either side exceeds `max_dimension`.
pub fn fit_within(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    let (tw, th) = target_dimensions(w, h, max_dimension);
    if (tw, th) == (w, h) {
        return img;
    }

    debug!("Resizing {}x{} → {}x{}", w, h, tw, th);
    img.resize_exact(tw, th, FilterType::Triangle)
}

//! Compression loop: lower JPEG quality until the data URI fits the budget.
//!
//! ```text
//! q = initial (0.9)
//! encode(q)
//! while len > budget × loop_slack (1.33) and q > floor (0.1):
//!     q -= step (0.1)
//!     encode(q)                      // same raster every time
//! if len > budget × fail_slack (1.5): TooLarge
//! ```
//!
//! The loop and the failure check use different multiples of the budget.
//! An output between the two limits is accepted even though the loop wanted
//! it smaller; only the outer limit is guaranteed.

use super::encode::encode_data_uri;
use crate::config::{PreprocessConfig, Quality};
use crate::error::PreprocessError;
use image::RgbImage;
use tracing::{debug, warn};

/// Result of a successful loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Compressed {
    pub data_uri: String,
    pub quality: Quality,
    pub attempts: u32,
}

/// Run the quality loop over `raster`.
///
/// `on_attempt(attempt, quality, encoded_len)` fires after each encode.
pub fn compress_to_budget<F>(
    raster: &RgbImage,
    config: &PreprocessConfig,
    mut on_attempt: F,
) -> Result<Compressed, PreprocessError>
where
    F: FnMut(u32, Quality, usize),
{
    let loop_limit = config.loop_limit();
    let fail_limit = config.fail_limit();
    let floor = config.min_quality;

    let mut quality = config.initial_quality;
    let mut attempts = 1;
    let mut data_uri = encode(raster, quality)?;
    on_attempt(attempts, quality, data_uri.len());

    while data_uri.len() > loop_limit && quality > floor {
        let next = quality.step_down(config.quality_step, floor);
        debug!(
            "{} chars > {} at q={}, retrying at q={}",
            data_uri.len(),
            loop_limit,
            quality,
            next
        );
        quality = next;
        attempts += 1;
        data_uri = encode(raster, quality)?;
        on_attempt(attempts, quality, data_uri.len());
    }

    if data_uri.len() > fail_limit {
        warn!(
            "Still {} chars at q={} after {} attempts (limit {})",
            data_uri.len(),
            quality,
            attempts,
            fail_limit
        );
        return Err(PreprocessError::TooLarge {
            encoded_len: data_uri.len(),
            limit: fail_limit,
            quality: quality.as_f32(),
        });
    }

    Ok(Compressed {
        data_uri,
        quality,
        attempts,
    })
}

fn encode(raster: &RgbImage, quality: Quality) -> Result<String, PreprocessError> {
    encode_data_uri(raster, quality).map_err(|e| PreprocessError::Encode {
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Deterministic xorshift noise; JPEG cannot compress it well.
    fn noise(w: u32, h: u32) -> RgbImage {
        let mut state: u32 = 0x9E37_79B9;
        RgbImage::from_fn(w, h, |_, _| {
            let mut px = [0u8; 3];
            for c in &mut px {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                *c = (state >> 24) as u8;
            }
            Rgb(px)
        })
    }

    fn config_with_budget(bytes: usize) -> PreprocessConfig {
        PreprocessConfig::builder()
            .size_budget_bytes(bytes)
            .build()
            .unwrap()
    }

    #[test]
    fn small_image_accepts_first_encode() {
        let raster = RgbImage::from_pixel(64, 64, Rgb([120, 120, 120]));
        let mut seen = Vec::new();
        let out = compress_to_budget(&raster, &PreprocessConfig::default(), |a, q, _| {
            seen.push((a, q.percent()))
        })
        .unwrap();
        assert_eq!(out.quality.percent(), 90);
        assert_eq!(out.attempts, 1);
        assert_eq!(seen, vec![(1, 90)]);
    }

    #[test]
    fn quality_is_monotonic_and_floored() {
        let raster = noise(256, 256);
        let mut qualities = Vec::new();
        // A 1-byte budget forces the loop all the way down.
        let result = compress_to_budget(&raster, &config_with_budget(1), |_, q, _| {
            qualities.push(q.percent())
        });
        assert!(matches!(result, Err(PreprocessError::TooLarge { .. })));
        assert_eq!(qualities, vec![90, 80, 70, 60, 50, 40, 30, 20, 10]);
    }

    #[test]
    fn noise_that_cannot_fit_is_too_large() {
        let raster = noise(512, 512);
        let err = compress_to_budget(&raster, &config_with_budget(2048), |_, _, _| {}).unwrap_err();
        match err {
            PreprocessError::TooLarge {
                encoded_len,
                limit,
                quality,
            } => {
                assert_eq!(limit, 3072);
                assert!(encoded_len > limit);
                assert!((quality - 0.1).abs() < 1e-6);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[test]
    fn stops_as_soon_as_under_loop_limit() {
        let raster = noise(96, 96);
        // Measure the sizes the loop would see, then pick a budget that only
        // the third encode satisfies.
        let sizes: Vec<usize> = [90u8, 80, 70]
            .iter()
            .map(|&p| encode_data_uri(&raster, Quality::from_percent(p)).unwrap().len())
            .collect();
        assert!(sizes[0] > sizes[2] && sizes[1] > sizes[2]);
        let budget = (sizes[2] as f64 / 1.33).ceil() as usize + 1;
        let config = config_with_budget(budget);
        assert!(sizes[1] > config.loop_limit(), "fixture too compressible");

        let out = compress_to_budget(&raster, &config, |_, _, _| {}).unwrap();
        assert_eq!(out.quality.percent(), 70);
        assert_eq!(out.attempts, 3);
        assert!(out.data_uri.len() <= config.fail_limit());
    }

    #[test]
    fn output_between_limits_is_accepted() {
        let raster = noise(64, 64);
        let floor_len = encode_data_uri(&raster, Quality::from_percent(10)).unwrap().len();
        // Pick a budget where the floor encode lies above the loop limit but
        // under the fail limit: loop_limit < len <= fail_limit.
        let budget = (floor_len as f64 / 1.4).round() as usize;
        let config = config_with_budget(budget);
        assert!(floor_len > config.loop_limit());
        assert!(floor_len <= config.fail_limit());

        let out = compress_to_budget(&raster, &config, |_, _, _| {}).unwrap();
        assert_eq!(out.quality.percent(), 10);
        assert!(out.data_uri.len() > config.loop_limit());
    }
}

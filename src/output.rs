//! Output types produced by the preprocessor.

use crate::config::Quality;
use serde::{Deserialize, Serialize};

/// MIME type of every encoded output.
pub const OUTPUT_MIME: &str = "image/jpeg";

/// The terminal artifact of a successful preprocessing run.
///
/// `data_uri` is ready to be stored as an opaque string field of a document.
/// Ownership passes to the caller; the preprocessor keeps no reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedOutput {
    /// `data:image/jpeg;base64,...`
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub data_uri: String,

    /// Always [`OUTPUT_MIME`].
    pub mime_type: String,

    /// Width of the encoded raster (after any downscale).
    pub width: u32,

    /// Height of the encoded raster (after any downscale).
    pub height: u32,

    /// Width of the decoded input.
    pub original_width: u32,

    /// Height of the decoded input.
    pub original_height: u32,

    /// Quality of the accepted encode.
    pub quality: Quality,

    /// Number of encodes performed, first one included.
    pub attempts: u32,

    /// Byte length of the image input.
    pub input_bytes: usize,

    /// Wall-clock time of the run.
    pub duration_ms: u64,
}

impl EncodedOutput {
    /// Length of the data URI, the value compared against the size limits.
    pub fn encoded_len(&self) -> usize {
        self.data_uri.len()
    }

    /// Approximate decoded byte size (`len × 3/4`).
    pub fn approx_bytes(&self) -> usize {
        self.data_uri.len() * 3 / 4
    }

    /// True when the raster was scaled down.
    pub fn was_resized(&self) -> bool {
        (self.width, self.height) != (self.original_width, self.original_height)
    }

    /// Number of quality reductions the loop made.
    pub fn loop_iterations(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    /// Base64 payload without the `data:...;base64,` prefix.
    pub fn base64_payload(&self) -> &str {
        self.data_uri
            .split_once(',')
            .map(|(_, payload)| payload)
            .unwrap_or("")
    }

    /// Copy of this output with the data URI body removed, for logging and
    /// JSON summaries.
    pub fn summary(&self) -> EncodedOutput {
        EncodedOutput {
            data_uri: String::new(),
            ..self.clone()
        }
    }
}

/// Header-level facts about an input image, from [`crate::inspect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// MIME type sniffed from the bytes.
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    /// Dimensions the preprocessor would encode at.
    pub target_width: u32,
    pub target_height: u32,
    pub byte_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncodedOutput {
        EncodedOutput {
            data_uri: "data:image/jpeg;base64,AAAA".into(),
            mime_type: OUTPUT_MIME.into(),
            width: 1920,
            height: 1440,
            original_width: 4000,
            original_height: 3000,
            quality: Quality::from_percent(70),
            attempts: 3,
            input_bytes: 10,
            duration_ms: 5,
        }
    }

    #[test]
    fn payload_and_sizes() {
        let out = sample();
        assert_eq!(out.base64_payload(), "AAAA");
        assert_eq!(out.encoded_len(), 27);
        assert_eq!(out.approx_bytes(), 20);
        assert!(out.was_resized());
        assert_eq!(out.loop_iterations(), 2);
    }

    #[test]
    fn summary_serialises_without_body() {
        let json = serde_json::to_value(sample().summary()).unwrap();
        assert!(json.get("data_uri").is_none());
        assert_eq!(json["width"], 1920);
        assert!((json["quality"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }
}

//! # photo-gallery-core
//!
//! Core of a photo gallery: turn user-selected images into size-bounded
//! inline data URIs, and run gallery, auth and storage operations over
//! pluggable backends.
//!
//! ## Why preprocess?
//!
//! Managed document databases cap a single record at around 1 MiB. Storing a
//! photo inline, next to its description and flags, means the encoded image
//! has to fit well under that cap. The preprocessor downsizes to at most
//! 1920 px on the longer side and lowers JPEG quality step by step until the
//! data URI fits a 700 KiB budget.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image bytes
//!  │
//!  ├─ 1. Decode    bytes → raster (spawn_blocking)
//!  ├─ 2. Resize    longer side ≤ 1920 px, aspect preserved
//!  ├─ 3. Encode    JPEG q=0.9 → data URI
//!  ├─ 4. Shrink    q −= 0.1 while len > budget × 1.33 and q > 0.1
//!  └─ 5. Check     len > budget × 1.5 → TooLarge, else done
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use photo_gallery_core::{preprocess_path, PreprocessConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PreprocessConfig::default();
//!     let output = preprocess_path("holiday.jpg", &config).await?;
//!     println!("{} chars at quality {}", output.encoded_len(), output.quality);
//!     Ok(())
//! }
//! ```
//!
//! ## Gallery services
//!
//! [`gallery::PhotoService`] and [`gallery::AuthService`] talk to the
//! backend only through the [`gallery::AuthProvider`],
//! [`gallery::DocumentStore`] and [`gallery::BlobStore`] traits. In-memory
//! implementations live in [`gallery::memory`] for tests and demos.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `photoprep` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod gallery;
pub mod output;
pub mod pipeline;
pub mod preprocess;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PreprocessConfig, PreprocessConfigBuilder, ProgressMode, Quality};
pub use error::{GalleryError, PreprocessError};
pub use output::{EncodedOutput, ImageInfo};
pub use pipeline::input::ImageInput;
pub use preprocess::{
    inspect, inspect_input, preprocess, preprocess_path, preprocess_sync, preprocess_to_file,
};
pub use progress::{NoopProgressCallback, PreprocessProgressCallback, ProgressCallback};

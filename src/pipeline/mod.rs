//! Pipeline stages for image preprocessing.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ decode ──▶ resize ──▶ encode ◀──▶ compress
//! (bytes)   (raster)   (≤1920px)  (JPEG URI)  (quality loop)
//! ```
//!
//! 1. [`input`]    — wrap bytes, sniff MIME, read paths and URLs
//! 2. [`decode`]   — bytes to `DynamicImage`
//! 3. [`resize`]   — cap the longer side, keep aspect ratio
//! 4. [`encode`]   — RGB8 raster to `data:image/jpeg;base64,...`
//! 5. [`compress`] — re-encode at falling quality until the size limits hold

pub mod compress;
pub mod decode;
pub mod encode;
pub mod input;
pub mod resize;

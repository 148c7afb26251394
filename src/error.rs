//! Error types for the photo-gallery-core library.
//!
//! Two error types reflect the two layers of the crate:
//!
//! * [`PreprocessError`] — the image preprocessor could not produce an
//!   encoded output (undecodable bytes, image still too large at the lowest
//!   quality, input could not be read). Every variant is terminal for the
//!   run: there is no partial output and no internal retry.
//!
//! * [`GalleryError`] — a gallery or auth operation failed. Wraps backend
//!   failures (auth provider, document store, blob store), validation
//!   failures and preprocessing failures so callers have one type to match on.

use crate::gallery::auth::user_message;
use crate::gallery::backend::{AuthErrorCode, AuthFailure, BlobError, StoreError};
use crate::gallery::validate::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the image preprocessor.
#[derive(Debug, Error)]
pub enum PreprocessError {
    // ── Core failures ─────────────────────────────────────────────────────
    /// The input bytes could not be interpreted as an image.
    #[error("Failed to decode image: {detail}")]
    Decode { detail: String },

    /// The compression loop reached its quality floor and the encoded output
    /// is still above the hard ceiling.
    #[error(
        "Image too large after compression: {encoded_len} chars at quality {quality:.1} \
(limit {limit})"
    )]
    TooLarge {
        encoded_len: usize,
        limit: usize,
        quality: f32,
    },

    /// The JPEG encoder rejected the raster.
    #[error("Failed to encode image: {detail}")]
    Encode { detail: String },

    /// Decode or encode did not finish within the configured timeout.
    #[error("Preprocessing timed out after {secs}s")]
    Timeout { secs: u64 },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a readable path nor a valid URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PreprocessError {
    /// True for the two terminal conditions of the compression core.
    pub fn is_core_failure(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::TooLarge { .. })
    }
}

/// Errors returned by gallery, auth and storage operations.
#[derive(Debug, Error)]
pub enum GalleryError {
    /// The auth provider rejected the request. `message` is user-facing.
    #[error("{message}")]
    Auth {
        code: AuthErrorCode,
        message: String,
    },

    /// An operation required a signed-in user.
    #[error("You must be logged in to do this")]
    NotSignedIn,

    /// The referenced document does not exist.
    #[error("No document '{id}' in collection '{collection}'")]
    NotFound { collection: String, id: String },

    /// Upload form input was rejected before any backend call.
    #[error("Invalid upload: {}", join_validation(.0))]
    Validation(Vec<ValidationError>),

    /// The document store failed.
    #[error("Document store error: {0}")]
    Store(String),

    /// The blob store failed.
    #[error("Blob store error: {0}")]
    Blob(String),

    /// A stored document could not be mapped to or from its model type.
    #[error("Malformed document: {0}")]
    Serde(#[from] serde_json::Error),

    /// Image preprocessing failed.
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
}

impl From<AuthFailure> for GalleryError {
    fn from(failure: AuthFailure) -> Self {
        let message = user_message(&failure);
        GalleryError::Auth {
            code: failure.code,
            message,
        }
    }
}

impl From<StoreError> for GalleryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { collection, id } => GalleryError::NotFound { collection, id },
            StoreError::Backend(msg) => GalleryError::Store(msg),
        }
    }
}

impl From<BlobError> for GalleryError {
    fn from(e: BlobError) -> Self {
        GalleryError::Blob(e.to_string())
    }
}

fn join_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

//! Input resolution: turn a path, URL or byte buffer into an [`ImageInput`].
//!
//! The preprocessor itself only ever sees bytes plus a declared MIME type.
//! This stage is where those come from: a drag-and-drop or file picker hands
//! us bytes directly, the CLI hands us a path or URL. MIME types are sniffed
//! from magic bytes, never from file extensions.

use crate::error::PreprocessError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// MIME used when the bytes match no known image signature.
pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// An image blob as selected by the user. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    bytes: Vec<u8>,
    mime_type: String,
    name: Option<String>,
}

impl ImageInput {
    /// Wrap bytes with a caller-declared MIME type.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            name: None,
        }
    }

    /// Wrap bytes and sniff the MIME type from their signature.
    pub fn sniff(bytes: impl Into<Vec<u8>>, name: Option<String>) -> Self {
        let bytes = bytes.into();
        let mime_type = sniff_mime(&bytes);
        Self {
            bytes,
            mime_type,
            name,
        }
    }

    /// Attach a file name (used for titles and blob paths).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when the declared MIME type is in the `image/` category.
    pub fn is_image(&self) -> bool {
        is_image_mime(&self.mime_type)
    }
}

/// True when `mime` is in the `image/` category.
pub fn is_image_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("image/")
}

/// Sniff a MIME type from magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| UNKNOWN_MIME.to_string())
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or URL to an [`ImageInput`].
///
/// URLs are downloaded into memory; local paths are read in full.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ImageInput, PreprocessError> {
    if input.trim().is_empty() {
        return Err(PreprocessError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

/// Read a local image file.
async fn read_local(path: &Path) -> Result<ImageInput, PreprocessError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PreprocessError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => PreprocessError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => PreprocessError::InvalidInput {
            input: format!("{}: {}", path.display(), e),
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    debug!("Read local image: {} ({} bytes)", path.display(), bytes.len());
    Ok(ImageInput::sniff(bytes, name))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ImageInput, PreprocessError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PreprocessError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PreprocessError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PreprocessError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(PreprocessError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let name = extract_filename(url);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| PreprocessError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(ImageInput::sniff(bytes.to_vec(), Some(name)))
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded-image".to_string()
}

/// Path of the temp file used for atomic writes next to `path`.
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

//! Preprocessing entry points.
//!
//! [`preprocess`] is the primary API: one image in, one size-bounded data
//! URI out. Decode, resize and the compression loop run as a single blocking
//! task on the tokio blocking pool; the async side only schedules progress
//! checkpoints and enforces the optional timeout.
//!
//! Concurrent runs share nothing. A caller that starts a new run before an
//! older one finishes is responsible for discarding the stale result.

use crate::config::{PreprocessConfig, ProgressMode};
use crate::error::PreprocessError;
use crate::output::{EncodedOutput, ImageInfo, OUTPUT_MIME};
use crate::pipeline::input::{self, temp_sibling, ImageInput};
use crate::pipeline::{compress, decode, encode, resize};
use crate::progress::{measured_attempt_percent, MonotonicProgress, SYNTHETIC_CHECKPOINTS};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Preprocess an image into a size-bounded JPEG data URI.
///
/// The input is consumed. The caller is expected to have checked that the
/// MIME type is an image type; it is not re-validated here.
///
/// # Errors
/// - [`PreprocessError::Decode`] — the bytes are not a decodable image
/// - [`PreprocessError::TooLarge`] — still over the hard limit at the
///   lowest quality
/// - [`PreprocessError::Timeout`] — `timeout_secs` elapsed first
///
/// # Example
/// ```rust,no_run
/// use photo_gallery_core::{preprocess, ImageInput, PreprocessConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("holiday.png")?;
/// let input = ImageInput::sniff(bytes, Some("holiday.png".into()));
/// let output = preprocess(input, &PreprocessConfig::default()).await?;
/// println!("{}x{} at q={}", output.width, output.height, output.quality);
/// # Ok(())
/// # }
/// ```
pub async fn preprocess(
    input: ImageInput,
    config: &PreprocessConfig,
) -> Result<EncodedOutput, PreprocessError> {
    let start = Instant::now();
    let input_len = input.len();
    info!(
        "Preprocessing {} ({} bytes, {})",
        input.name().unwrap_or("<unnamed>"),
        input_len,
        input.mime_type()
    );

    let progress = MonotonicProgress::new(config.progress_callback.clone());
    if let Some(cb) = progress.callback() {
        cb.on_start(input_len);
    }
    progress.emit(0);

    let ticker = match config.progress_mode {
        ProgressMode::Synthetic => Some(spawn_synthetic_ticker(
            Arc::clone(&progress),
            Duration::from_millis(config.synthetic_tick_ms),
        )),
        ProgressMode::Measured => None,
    };

    let worker = {
        let bytes = input.into_bytes();
        let config = config.clone();
        let progress = Arc::clone(&progress);
        tokio::task::spawn_blocking(move || run_blocking(&bytes, &config, &progress))
    };

    let result = await_worker(worker, config.timeout_secs).await;

    if let Some(ticker) = ticker {
        ticker.abort();
    }

    settle(result, &progress, input_len, start)
}

/// Synchronous wrapper around [`preprocess`].
///
/// Creates a temporary tokio runtime internally; do not call from inside an
/// async context.
pub fn preprocess_sync(
    input: ImageInput,
    config: &PreprocessConfig,
) -> Result<EncodedOutput, PreprocessError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PreprocessError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(preprocess(input, config))
}

/// Resolve a local path or URL and preprocess it.
pub async fn preprocess_path(
    input_str: impl AsRef<str>,
    config: &PreprocessConfig,
) -> Result<EncodedOutput, PreprocessError> {
    let input = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    preprocess(input, config).await
}

/// Preprocess and write the data URI to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
/// Returns the output with its `data_uri` body removed.
pub async fn preprocess_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &PreprocessConfig,
) -> Result<EncodedOutput, PreprocessError> {
    let output = preprocess_path(input_str, config).await?;
    let path = output_path.as_ref();
    let write_err = |source| PreprocessError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = temp_sibling(path);
    tokio::fs::write(&tmp_path, output.data_uri.as_bytes())
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    debug!("Wrote {} chars to {}", output.encoded_len(), path.display());
    Ok(output.summary())
}

/// Read header facts about an image without compressing it.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &PreprocessConfig,
) -> Result<ImageInfo, PreprocessError> {
    let input = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    inspect_input(&input, config)
}

/// Header facts for an in-memory input.
pub fn inspect_input(
    input: &ImageInput,
    config: &PreprocessConfig,
) -> Result<ImageInfo, PreprocessError> {
    let (width, height) = decode::read_dimensions(input.bytes())?;
    let (target_width, target_height) =
        resize::target_dimensions(width, height, config.max_dimension);
    Ok(ImageInfo {
        mime_type: input::sniff_mime(input.bytes()),
        width,
        height,
        target_width,
        target_height,
        byte_len: input.len(),
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Decode → resize → compress, on the blocking pool.
fn run_blocking(
    bytes: &[u8],
    config: &PreprocessConfig,
    progress: &MonotonicProgress,
) -> Result<EncodedOutput, PreprocessError> {
    let measured = config.progress_mode == ProgressMode::Measured;

    let decoded = decode::decode_image(bytes)?;
    let (original_width, original_height) = (decoded.width(), decoded.height());
    if measured {
        progress.emit(10);
    }

    let resized = resize::fit_within(decoded, config.max_dimension);
    let raster = encode::to_encodable(resized);
    if measured {
        progress.emit(20);
    }

    let max_attempts = config.max_attempts();
    let compressed = compress::compress_to_budget(&raster, config, |attempt, quality, len| {
        if let Some(cb) = progress.callback() {
            cb.on_attempt(attempt, quality, len);
        }
        if measured {
            progress.emit(measured_attempt_percent(attempt, max_attempts));
        }
    })?;

    Ok(EncodedOutput {
        data_uri: compressed.data_uri,
        mime_type: OUTPUT_MIME.to_string(),
        width: raster.width(),
        height: raster.height(),
        original_width,
        original_height,
        quality: compressed.quality,
        attempts: compressed.attempts,
        input_bytes: bytes.len(),
        duration_ms: 0,
    })
}

/// Report the worker's result through the callback. `100` is only sent on
/// success.
fn settle(
    result: Result<EncodedOutput, PreprocessError>,
    progress: &MonotonicProgress,
    input_len: usize,
    start: Instant,
) -> Result<EncodedOutput, PreprocessError> {
    match result {
        Ok(mut output) => {
            output.input_bytes = input_len;
            output.duration_ms = start.elapsed().as_millis() as u64;
            progress.emit(100);
            if let Some(cb) = progress.callback() {
                cb.on_complete(&output);
            }
            info!(
                "Preprocessed to {}x{} q={} in {} attempt(s), {} chars, {}ms",
                output.width,
                output.height,
                output.quality,
                output.attempts,
                output.encoded_len(),
                output.duration_ms
            );
            Ok(output)
        }
        Err(e) => {
            warn!("Preprocessing failed: {}", e);
            if let Some(cb) = progress.callback() {
                cb.on_error(&e.to_string());
            }
            Err(e)
        }
    }
}

/// Await the blocking worker, optionally bounded by a timeout.
///
/// On timeout the blocking thread cannot be interrupted; it finishes in the
/// background and its result is dropped.
async fn await_worker(
    worker: JoinHandle<Result<EncodedOutput, PreprocessError>>,
    timeout_secs: Option<u64>,
) -> Result<EncodedOutput, PreprocessError> {
    let joined = match timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), worker)
            .await
            .map_err(|_| PreprocessError::Timeout { secs })?,
        None => worker.await,
    };

    joined.map_err(|e| PreprocessError::Internal(format!("Preprocess task panicked: {}", e)))?
}

/// Emit the placeholder checkpoints on a timer until aborted.
fn spawn_synthetic_ticker(progress: Arc<MonotonicProgress>, tick: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        for checkpoint in SYNTHETIC_CHECKPOINTS {
            tokio::time::sleep(tick).await;
            progress.emit(checkpoint);
        }
    })
}

//! Progress-callback trait for preprocessing events.
//!
//! Inject an [`Arc<dyn PreprocessProgressCallback>`] via
//! [`crate::config::PreprocessConfigBuilder::progress_callback`] to receive
//! events while an image is decoded, resized and compressed.
//!
//! Progress percentages are non-decreasing within a run. Which values are
//! emitted depends on [`crate::config::ProgressMode`]:
//!
//! * `Synthetic` — `0`, then `25`, `50`, `75` on a timer while work runs,
//!   then `100`. The timer stops as soon as the work finishes, so a fast run
//!   may jump straight from `0` to `100`.
//! * `Measured` — `0`, `10` after decode, `20` after resize, one value per
//!   encode attempt, then `100`.
//!
//! # Example
//!
//! ```rust
//! use photo_gallery_core::{PreprocessConfig, PreprocessProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicU8, Ordering}};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl PreprocessProgressCallback for LastPercent {
//!     fn on_progress(&self, percent: u8) {
//!         self.0.store(percent, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = PreprocessConfig::builder()
//!     .progress_callback(Arc::new(LastPercent(AtomicU8::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::config::Quality;
use crate::output::EncodedOutput;
use std::sync::{Arc, Mutex};

/// Placeholder checkpoints of the synthetic schedule, in emission order.
pub const SYNTHETIC_CHECKPOINTS: [u8; 3] = [25, 50, 75];

/// Called by the preprocessor as a run advances.
///
/// Implementations must be `Send + Sync`: encode attempts are reported from
/// the blocking thread pool while synthetic checkpoints come from a tokio
/// task. All methods default to no-ops.
pub trait PreprocessProgressCallback: Send + Sync {
    /// Called once before decoding starts.
    ///
    /// # Arguments
    /// * `input_len` — byte length of the image input
    fn on_start(&self, input_len: usize) {
        let _ = input_len;
    }

    /// Called with a percentage in 0–100.
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// Called after every JPEG encode.
    ///
    /// # Arguments
    /// * `attempt`     — 1-based attempt number
    /// * `quality`     — quality used for this encode
    /// * `encoded_len` — length of the resulting data URI
    fn on_attempt(&self, attempt: u32, quality: Quality, encoded_len: usize) {
        let _ = (attempt, quality, encoded_len);
    }

    /// Called once on success, after the final `on_progress(100)`.
    fn on_complete(&self, output: &EncodedOutput) {
        let _ = output;
    }

    /// Called once when the run fails. No `100` is emitted in that case.
    fn on_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PreprocessProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PreprocessConfig`].
pub type ProgressCallback = Arc<dyn PreprocessProgressCallback>;

/// Forwards percentages to a callback, dropping any value lower than one
/// already sent. Shared between the synthetic ticker and the pipeline, so the
/// check and the callback run under one lock.
pub(crate) struct MonotonicProgress {
    callback: Option<ProgressCallback>,
    last: Mutex<Option<u8>>,
}

impl MonotonicProgress {
    pub(crate) fn new(callback: Option<ProgressCallback>) -> Arc<Self> {
        Arc::new(Self {
            callback,
            last: Mutex::new(None),
        })
    }

    pub(crate) fn callback(&self) -> Option<&ProgressCallback> {
        self.callback.as_ref()
    }

    /// Emit `percent` unless it would move progress backwards.
    pub(crate) fn emit(&self, percent: u8) {
        let percent = percent.min(100);
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(*last, Some(prev) if prev >= percent) {
            return;
        }
        *last = Some(percent);
        if let Some(cb) = &self.callback {
            cb.on_progress(percent);
        }
    }

    #[cfg(test)]
    pub(crate) fn last(&self) -> u8 {
        self.last
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .unwrap_or(0)
    }
}

/// Percentage reported after encode attempt `attempt` in measured mode.
pub(crate) fn measured_attempt_percent(attempt: u32, max_attempts: u32) -> u8 {
    let max = max_attempts.max(1);
    let attempt = attempt.min(max);
    (20 + 75 * attempt / max) as u8
}

//! Configuration types for image preprocessing.
//!
//! All preprocessing behaviour is controlled through [`PreprocessConfig`],
//! built via its [`PreprocessConfigBuilder`]. Keeping every knob in one struct
//! makes it trivial to share a config between the gallery service, the CLI
//! and tests.

use crate::error::PreprocessError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default longest-side limit in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 1920;

/// Default size budget: 700 KiB.
pub const DEFAULT_SIZE_BUDGET_BYTES: usize = 700 * 1024;

/// Multiple of the budget at which the quality loop stops.
pub const DEFAULT_LOOP_SLACK: f64 = 1.33;

/// Multiple of the budget above which the run fails.
pub const DEFAULT_FAIL_SLACK: f64 = 1.5;

/// JPEG compression quality in (0, 1], stored as a whole percentage.
///
/// Stepping in whole percents keeps `0.9 - 0.1 - 0.1 ...` exact, so the
/// loop visits 0.9, 0.8, … 0.1 and stops there instead of drifting to
/// 0.09999.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "f32", try_from = "f32")]
pub struct Quality(u8);

impl Quality {
    pub const MAX: Quality = Quality(100);
    pub const MIN: Quality = Quality(1);

    /// Build from a whole percentage, clamped to 1–100.
    pub fn from_percent(percent: u8) -> Self {
        Quality(percent.clamp(1, 100))
    }

    /// Build from a fraction in (0, 1]; out-of-range values are clamped.
    pub fn from_f32(value: f32) -> Self {
        let percent = (value * 100.0).round();
        if percent.is_nan() || percent < 1.0 {
            Quality::MIN
        } else if percent > 100.0 {
            Quality::MAX
        } else {
            Quality(percent as u8)
        }
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    pub fn as_f32(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    /// Lower by `step` percent without going below `floor`.
    pub fn step_down(self, step: u8, floor: Quality) -> Quality {
        Quality(self.0.saturating_sub(step).max(floor.0))
    }
}

impl From<Quality> for f32 {
    fn from(q: Quality) -> f32 {
        q.as_f32()
    }
}

impl TryFrom<f32> for Quality {
    type Error = String;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if value > 0.0 && value <= 1.0 {
            Ok(Quality::from_f32(value))
        } else {
            Err(format!("quality must be in (0, 1], got {value}"))
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.as_f32())
    }
}

/// How progress values are produced during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProgressMode {
    /// Fixed checkpoints on a timer (0, placeholders, then 100), independent
    /// of real work. Matches what existing upload UIs expect. (default)
    #[default]
    Synthetic,
    /// Checkpoints derived from pipeline stages and encode attempts.
    Measured,
}

/// Configuration for one preprocessing run.
///
/// Built via [`PreprocessConfig::builder()`] or using
/// [`PreprocessConfig::default()`].
///
/// # Example
/// ```rust
/// use photo_gallery_core::PreprocessConfig;
///
/// let config = PreprocessConfig::builder()
///     .max_dimension(1280)
///     .size_budget_bytes(300 * 1024)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_dimension, 1280);
/// ```
#[derive(Clone)]
pub struct PreprocessConfig {
    /// Longest allowed side in pixels. Larger rasters are scaled down so
    /// their longer side equals this value. Default: 1920.
    pub max_dimension: u32,

    /// Target stored size in bytes. Default: 700 KiB.
    ///
    /// Inline document fields have a hard size cap in most managed document
    /// databases (around 1 MiB); the budget leaves headroom for the rest of
    /// the record.
    pub size_budget_bytes: usize,

    /// Quality of the first encode. Default: 0.9.
    pub initial_quality: Quality,

    /// Percent removed from the quality after each oversized encode. Default: 10.
    pub quality_step: u8,

    /// Lowest quality the loop will try. Default: 0.1.
    pub min_quality: Quality,

    /// The loop re-encodes while the output is longer than
    /// `size_budget_bytes × loop_slack`. Default: 1.33.
    pub loop_slack: f64,

    /// The run fails when the final output is longer than
    /// `size_budget_bytes × fail_slack`. Default: 1.5.
    pub fail_slack: f64,

    /// Overall limit for decode + encode, in seconds. Default: none.
    pub timeout_secs: Option<u64>,

    /// Progress schedule. Default: [`ProgressMode::Synthetic`].
    pub progress_mode: ProgressMode,

    /// Interval between synthetic placeholder checkpoints. Default: 150.
    pub synthetic_tick_ms: u64,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            size_budget_bytes: DEFAULT_SIZE_BUDGET_BYTES,
            initial_quality: Quality::from_percent(90),
            quality_step: 10,
            min_quality: Quality::from_percent(10),
            loop_slack: DEFAULT_LOOP_SLACK,
            fail_slack: DEFAULT_FAIL_SLACK,
            timeout_secs: None,
            progress_mode: ProgressMode::default(),
            synthetic_tick_ms: 150,
            progress_callback: None,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for PreprocessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreprocessConfig")
            .field("max_dimension", &self.max_dimension)
            .field("size_budget_bytes", &self.size_budget_bytes)
            .field("initial_quality", &self.initial_quality)
            .field("quality_step", &self.quality_step)
            .field("min_quality", &self.min_quality)
            .field("loop_slack", &self.loop_slack)
            .field("fail_slack", &self.fail_slack)
            .field("timeout_secs", &self.timeout_secs)
            .field("progress_mode", &self.progress_mode)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn PreprocessProgressCallback>"),
            )
            .finish()
    }
}

impl PreprocessConfig {
    /// Create a new builder for `PreprocessConfig`.
    pub fn builder() -> PreprocessConfigBuilder {
        PreprocessConfigBuilder {
            config: Self::default(),
        }
    }

    /// Encoded length above which another, lower-quality encode is tried.
    pub fn loop_limit(&self) -> usize {
        (self.size_budget_bytes as f64 * self.loop_slack) as usize
    }

    /// Encoded length above which the run fails.
    pub fn fail_limit(&self) -> usize {
        (self.size_budget_bytes as f64 * self.fail_slack) as usize
    }

    /// Upper bound on encode attempts in one run (first encode included).
    pub fn max_attempts(&self) -> u32 {
        let span = self
            .initial_quality
            .percent()
            .saturating_sub(self.min_quality.percent());
        let step = self.quality_step.max(1);
        1 + u32::from(span.div_ceil(step))
    }
}

/// Builder for [`PreprocessConfig`].
pub struct PreprocessConfigBuilder {
    config: PreprocessConfig,
}

impl fmt::Debug for PreprocessConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreprocessConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl PreprocessConfigBuilder {
    pub fn max_dimension(mut self, px: u32) -> Self {
        self.config.max_dimension = px;
        self
    }

    pub fn size_budget_bytes(mut self, bytes: usize) -> Self {
        self.config.size_budget_bytes = bytes;
        self
    }

    pub fn size_budget_kib(self, kib: usize) -> Self {
        self.size_budget_bytes(kib.saturating_mul(1024))
    }

    pub fn initial_quality(mut self, q: f32) -> Self {
        self.config.initial_quality = Quality::from_f32(q);
        self
    }

    pub fn quality_step(mut self, step: f32) -> Self {
        self.config.quality_step = (step * 100.0).round().clamp(0.0, 100.0) as u8;
        self
    }

    pub fn min_quality(mut self, q: f32) -> Self {
        self.config.min_quality = Quality::from_f32(q);
        self
    }

    pub fn loop_slack(mut self, factor: f64) -> Self {
        self.config.loop_slack = factor;
        self
    }

    pub fn fail_slack(mut self, factor: f64) -> Self {
        self.config.fail_slack = factor;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    pub fn progress_mode(mut self, mode: ProgressMode) -> Self {
        self.config.progress_mode = mode;
        self
    }

    pub fn synthetic_tick_ms(mut self, ms: u64) -> Self {
        self.config.synthetic_tick_ms = ms.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PreprocessConfig, PreprocessError> {
        let c = &self.config;
        if c.max_dimension == 0 {
            return Err(PreprocessError::InvalidConfig(
                "max_dimension must be ≥ 1".into(),
            ));
        }
        if c.size_budget_bytes == 0 {
            return Err(PreprocessError::InvalidConfig(
                "size budget must be ≥ 1 byte".into(),
            ));
        }
        if c.quality_step == 0 {
            return Err(PreprocessError::InvalidConfig(
                "quality step must be > 0".into(),
            ));
        }
        if c.min_quality > c.initial_quality {
            return Err(PreprocessError::InvalidConfig(format!(
                "min quality {} exceeds initial quality {}",
                c.min_quality, c.initial_quality
            )));
        }
        if !(c.loop_slack > 0.0) || !(c.fail_slack > 0.0) {
            return Err(PreprocessError::InvalidConfig(
                "slack factors must be positive".into(),
            ));
        }
        if c.fail_slack < c.loop_slack {
            return Err(PreprocessError::InvalidConfig(format!(
                "fail slack {} is below loop slack {}",
                c.fail_slack, c.loop_slack
            )));
        }
        if c.timeout_secs == Some(0) {
            return Err(PreprocessError::InvalidConfig(
                "timeout must be ≥ 1s".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let c = PreprocessConfig::default();
        assert_eq!(c.max_dimension, 1920);
        assert_eq!(c.size_budget_bytes, 716_800);
        assert_eq!(c.initial_quality.percent(), 90);
        assert_eq!(c.min_quality.percent(), 10);
        assert_eq!(c.loop_limit(), 953_344);
        assert_eq!(c.fail_limit(), 1_075_200);
    }

    #[test]
    fn default_run_allows_nine_attempts() {
        // 0.9, 0.8, ..., 0.1
        assert_eq!(PreprocessConfig::default().max_attempts(), 9);
    }

    #[test]
    fn quality_steps_are_exact() {
        let floor = Quality::from_percent(10);
        let mut q = Quality::from_f32(0.9);
        let mut seen = vec![q.percent()];
        while q > floor {
            q = q.step_down(10, floor);
            seen.push(q.percent());
        }
        assert_eq!(seen, vec![90, 80, 70, 60, 50, 40, 30, 20, 10]);
    }

    #[test]
    fn step_down_never_crosses_floor() {
        let floor = Quality::from_percent(10);
        assert_eq!(Quality::from_percent(15).step_down(10, floor), floor);
        assert_eq!(floor.step_down(10, floor), floor);
    }

    #[test]
    fn quality_from_f32_clamps() {
        assert_eq!(Quality::from_f32(0.0), Quality::MIN);
        assert_eq!(Quality::from_f32(2.0), Quality::MAX);
        assert_eq!(Quality::from_f32(f32::NAN), Quality::MIN);
        assert!(Quality::try_from(0.0_f32).is_err());
        assert!(Quality::try_from(0.5_f32).is_ok());
    }

    #[test]
    fn builder_rejects_inverted_slack() {
        let err = PreprocessConfig::builder()
            .loop_slack(1.6)
            .fail_slack(1.5)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("fail slack"), "got: {err}");
    }

    #[test]
    fn builder_rejects_min_above_initial() {
        assert!(PreprocessConfig::builder()
            .initial_quality(0.3)
            .min_quality(0.5)
            .build()
            .is_err());
    }

    #[test]
    fn builder_rejects_zero_dimension_and_budget() {
        assert!(PreprocessConfig::builder().max_dimension(0).build().is_err());
        assert!(PreprocessConfig::builder().size_budget_bytes(0).build().is_err());
    }

    #[test]
    fn size_budget_kib_converts() {
        let c = PreprocessConfig::builder().size_budget_kib(2).build().unwrap();
        assert_eq!(c.size_budget_bytes, 2048);
    }
}

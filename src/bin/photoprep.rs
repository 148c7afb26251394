//! CLI binary for photo-gallery-core.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PreprocessConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use photo_gallery_core::{
    inspect, preprocess_path, preprocess_to_file, EncodedOutput, PreprocessConfig,
    PreprocessProgressCallback, ProgressCallback, ProgressMode, Quality,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Percentage bar plus one log line per encode attempt.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(100);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PreprocessProgressCallback for CliProgressCallback {
    fn on_start(&self, input_len: usize) {
        self.bar.set_prefix("Compressing");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Preprocessing {input_len} bytes…"))
        ));
    }

    fn on_progress(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn on_attempt(&self, attempt: u32, quality: Quality, encoded_len: usize) {
        self.bar.println(format!(
            "  {} attempt {:>2}  q={}  {}",
            dim("·"),
            attempt,
            quality,
            dim(&format!("{encoded_len:>9} chars")),
        ));
        self.bar.set_message(format!("q={quality}"));
    }

    fn on_complete(&self, output: &EncodedOutput) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}x{} → {}x{} at q={}  {}",
            green("✔"),
            output.original_width,
            output.original_height,
            bold(&output.width.to_string()),
            bold(&output.height.to_string()),
            output.quality,
            dim(&format!("{} chars", output.encoded_len())),
        );
    }

    fn on_error(&self, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", red("✘"), red(error));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print the data URI to stdout
  photoprep holiday.png

  # Write it to a file
  photoprep holiday.png -o holiday.datauri

  # Smaller budget, finer progress
  photoprep --budget-kib 300 --progress measured big.jpg -o big.datauri

  # From a URL
  photoprep https://example.com/photo.jpg -o photo.datauri

  # Dimensions and resize target only
  photoprep --inspect-only holiday.png

  # Metadata as JSON
  photoprep --json holiday.png -o holiday.datauri

SIZE LIMITS:
  Quality drops by 0.1 while the data URI is longer than budget × 1.33.
  The run fails if it is still longer than budget × 1.5 at the lowest
  quality. With the default 700 KiB budget those limits are 953,344 and
  1,075,200 characters.

ENVIRONMENT VARIABLES:
  Every flag can be set through PHOTOPREP_<FLAG>, e.g.
  PHOTOPREP_BUDGET_KIB=500 or PHOTOPREP_PROGRESS=measured.
  RUST_LOG overrides the log filter.
"#;

/// Resize and compress an image into a size-bounded JPEG data URI.
#[derive(Parser, Debug)]
#[command(
    name = "photoprep",
    version,
    about = "Resize and compress an image into a size-bounded JPEG data URI",
    long_about = "Decode an image (local file or URL), downscale it so the longer side is at \
most 1920 px, and lower JPEG quality step by step until the base64 data URI fits the size \
budget. The result can be stored inline in a document database record.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image path or HTTP/HTTPS URL.
    input: String,

    /// Write the data URI to this file instead of stdout.
    #[arg(short, long, env = "PHOTOPREP_OUTPUT")]
    output: Option<PathBuf>,

    /// Longest allowed side in pixels.
    #[arg(long, env = "PHOTOPREP_MAX_DIMENSION", default_value_t = 1920)]
    max_dimension: u32,

    /// Size budget in KiB.
    #[arg(long, env = "PHOTOPREP_BUDGET_KIB", default_value_t = 700)]
    budget_kib: usize,

    /// Starting JPEG quality (0.0–1.0).
    #[arg(long, env = "PHOTOPREP_INITIAL_QUALITY", default_value_t = 0.9)]
    initial_quality: f32,

    /// Give up after this many seconds.
    #[arg(long, env = "PHOTOPREP_TIMEOUT")]
    timeout: Option<u64>,

    /// Progress schedule: synthetic or measured.
    #[arg(long, env = "PHOTOPREP_PROGRESS", value_enum, default_value = "synthetic")]
    progress: ProgressArg,

    /// Output structured JSON (EncodedOutput) instead of the raw data URI.
    #[arg(long, env = "PHOTOPREP_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PHOTOPREP_NO_PROGRESS")]
    no_progress: bool,

    /// Print dimensions and resize target only, no compression.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PHOTOPREP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PHOTOPREP_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PHOTOPREP_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ProgressArg {
    Synthetic,
    Measured,
}

impl From<ProgressArg> for ProgressMode {
    fn from(v: ProgressArg) -> Self {
        match v {
            ProgressArg::Synthetic => ProgressMode::Synthetic,
            ProgressArg::Measured => ProgressMode::Measured,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PreprocessProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect image")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize image info")?
            );
        } else {
            println!("File:         {}", cli.input);
            println!("Format:       {}", info.mime_type);
            println!("Size:         {} bytes", info.byte_len);
            println!("Dimensions:   {}x{}", info.width, info.height);
            println!("Target:       {}x{}", info.target_width, info.target_height);
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let summary = preprocess_to_file(&cli.input, output_path, &config)
            .await
            .context("Preprocessing failed")?;

        if cli.json {
            let json =
                serde_json::to_string_pretty(&summary).context("Failed to serialise output")?;
            println!("{json}");
        } else if !cli.quiet {
            eprintln!(
                "{}  {} attempt(s)  {}ms  →  {}",
                green("✔"),
                summary.attempts,
                summary.duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let output = preprocess_path(&cli.input, &config)
            .await
            .context("Preprocessing failed")?;

        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        } else {
            write_data_uri(&mut io::stdout().lock(), &output.data_uri)?;
        }

        // The progress callback already printed its own summary.
        if !cli.quiet && !show_progress && !cli.json {
            eprintln!(
                "Encoded {}x{} at q={} in {}ms ({} chars)",
                output.width,
                output.height,
                output.quality,
                output.duration_ms,
                output.encoded_len()
            );
        }
    }

    Ok(())
}

/// Write the data URI plus a trailing newline.
fn write_data_uri(out: &mut impl Write, data_uri: &str) -> Result<()> {
    out.write_all(data_uri.as_bytes())
        .context("Failed to write to stdout")?;
    out.write_all(b"\n").context("Failed to write to stdout")?;
    out.flush().context("Failed to flush stdout")
}

/// Map CLI args to `PreprocessConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PreprocessConfig> {
    let mut builder = PreprocessConfig::builder()
        .max_dimension(cli.max_dimension)
        .size_budget_kib(cli.budget_kib)
        .initial_quality(cli.initial_quality)
        .progress_mode(cli.progress.clone().into())
        .download_timeout_secs(cli.download_timeout);

    if let Some(secs) = cli.timeout {
        builder = builder.timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts `room` bytes, then fails.
    struct Cramped {
        room: usize,
        written: Vec<u8>,
    }

    impl Write for Cramped {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.room == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
            }
            let n = buf.len().min(self.room);
            self.room -= n;
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn data_uri_ends_with_newline() {
        let mut out = Vec::new();
        write_data_uri(&mut out, "data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(out, b"data:image/jpeg;base64,AAAA\n");
    }

    #[test]
    fn failed_newline_write_is_an_error() {
        let uri = "data:image/jpeg;base64,AAAA";
        let mut out = Cramped {
            room: uri.len(),
            written: Vec::new(),
        };
        let err = write_data_uri(&mut out, uri).unwrap_err();
        assert!(err.to_string().contains("stdout"), "{err}");
        assert_eq!(out.written, uri.as_bytes());
    }

    #[test]
    fn cli_flags_map_onto_config() {
        let cli = Cli::parse_from(["photoprep", "in.png", "--budget-kib", "300", "--timeout", "4"]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.size_budget_bytes, 300 * 1024);
        assert_eq!(config.timeout_secs, Some(4));
        assert_eq!(config.max_dimension, 1920);
    }
}

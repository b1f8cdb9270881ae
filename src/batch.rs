//! Batch runner driving one decode run over an ordered file list

use crate::config::RunConfig;
use crate::decoder::{SymbolDecoder, format_symbols};
use crate::error::Result;
use crate::gray::to_grayscale;
use crate::report::{DECODE_FAILED, INVALID_IMAGE, summary_lines};
use crate::store::{base_name, load_image};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Per-file result of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum Outcome {
    /// The file could not be read as an image
    InvalidImage,
    /// The decoder found no reportable symbol
    NotDecoded,
    /// Reportable payloads, already joined for output
    Decoded(String),
}

/// One line of a run's output, emitted once per file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRecord {
    /// 1-based position in the file list
    pub index: usize,
    /// Number of files in the run
    pub total: usize,
    /// File base name
    pub name: String,
    /// What happened to the file
    pub outcome: Outcome,
}

impl fmt::Display for BatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} : {}", self.index, self.total, self.name)?;
        match &self.outcome {
            Outcome::InvalidImage => write!(f, " | {INVALID_IMAGE}"),
            Outcome::NotDecoded => write!(f, " | {DECODE_FAILED}"),
            Outcome::Decoded(text) => write!(f, " | {text}"),
        }
    }
}

/// Totals computed once at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Files where the decoder found any symbol, reportable or not ("Total read")
    pub decoded: usize,
    /// Files decoded to nothing reportable
    pub not_decoded: usize,
    /// Files that failed to load
    pub invalid: usize,
    /// Files handled before the run ended
    pub processed: usize,
    /// Number of files in the list
    pub total: usize,
    /// Decoder calls spent in region sweeps
    pub roi_scans: u64,
    /// Whether the run stopped early on request
    pub cancelled: bool,
    /// Wall time of the loop
    pub elapsed: Duration,
}

impl BatchSummary {
    /// The two trailing report lines
    pub fn lines(&self) -> [String; 2] {
        summary_lines(self.decoded, self.elapsed)
    }
}

/// Receiver of records as they are produced.
pub trait RecordSink {
    /// Called once per file, in list order
    fn record(&mut self, record: &BatchRecord) -> Result<()>;

    /// Called once after the last file
    fn summary(&mut self, _summary: &BatchSummary) -> Result<()> {
        Ok(())
    }
}

impl RecordSink for Vec<BatchRecord> {
    fn record(&mut self, record: &BatchRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Cooperative stop request, checked between files
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// New, unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running batch to stop after the current file
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome plus sweep cost for one file
struct FileResult {
    outcome: Outcome,
    /// The raw symbol set was non-empty, even if the filter left no text
    symbols_found: bool,
    roi_scans: u64,
}

impl FileResult {
    fn invalid() -> Self {
        Self {
            outcome: Outcome::InvalidImage,
            symbols_found: false,
            roi_scans: 0,
        }
    }
}

/// Drives a decoder over a file list with the configured policy.
pub struct BatchRunner {
    decoder: Arc<dyn SymbolDecoder>,
    config: RunConfig,
    cancel: CancelFlag,
}

impl BatchRunner {
    /// Create a runner for one immutable run configuration
    pub fn new(decoder: Arc<dyn SymbolDecoder>, config: RunConfig) -> Self {
        Self {
            decoder,
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Share an externally owned cancellation flag
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that stops this runner at the next file boundary
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Configuration this runner was built with
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Process `files` in order, streaming one record per file into `sink`.
    ///
    /// Unreadable images, empty decodes and decoder panics are recorded and
    /// the loop moves on; only sink failures end the run with an error.
    pub async fn run(&self, files: &[PathBuf], sink: &mut dyn RecordSink) -> Result<BatchSummary> {
        let total = files.len();
        let policy = self.config.policy;
        let mut summary = BatchSummary {
            total,
            ..BatchSummary::default()
        };

        info!(
            total,
            policy = ?policy.kind(),
            decoder = self.decoder.name(),
            "Starting batch"
        );
        let started = Instant::now();

        for (position, path) in files.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(processed = summary.processed, total, "Batch cancelled");
                summary.cancelled = true;
                break;
            }

            let file = if self.config.background {
                let decoder = Arc::clone(&self.decoder);
                let config = self.config.clone();
                let worker_path = path.clone();
                let worker = tokio::task::spawn_blocking(move || {
                    process_file(decoder.as_ref(), &config, &worker_path)
                });
                match worker.await {
                    Ok(file) => file,
                    Err(err) if err.is_panic() => {
                        let payload = err.into_panic();
                        decoder_panicked(path, &*payload)
                    }
                    Err(err) => return Err(err.into()),
                }
            } else {
                let decoder = self.decoder.as_ref();
                match panic::catch_unwind(AssertUnwindSafe(|| {
                    process_file(decoder, &self.config, path)
                })) {
                    Ok(file) => file,
                    Err(payload) => decoder_panicked(path, &*payload),
                }
            };

            match &file.outcome {
                Outcome::InvalidImage => summary.invalid += 1,
                Outcome::NotDecoded => summary.not_decoded += 1,
                Outcome::Decoded(_) => {}
            }
            if file.symbols_found {
                summary.decoded += 1;
            }
            summary.roi_scans += file.roi_scans;
            summary.processed += 1;

            let record = BatchRecord {
                index: position + 1,
                total,
                name: base_name(path),
                outcome: file.outcome,
            };
            debug!(%record, "Processed file");
            sink.record(&record)?;
        }

        summary.elapsed = started.elapsed();
        info!(
            decoded = summary.decoded,
            not_decoded = summary.not_decoded,
            invalid = summary.invalid,
            roi_scans = summary.roi_scans,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Batch finished"
        );
        sink.summary(&summary)?;

        Ok(summary)
    }
}

fn process_file(decoder: &dyn SymbolDecoder, config: &RunConfig, path: &Path) -> FileResult {
    let image = match load_image(path) {
        Ok(image) => image,
        Err(err) => {
            warn!("Skipping file: {err}");
            return FileResult::invalid();
        }
    };

    let gray = to_grayscale(&image);
    drop(image);

    let decoded = config.policy.decode(decoder, &gray);
    let text = format_symbols(&decoded.result, &config.filter);
    let outcome = if text.is_empty() {
        Outcome::NotDecoded
    } else {
        Outcome::Decoded(text)
    };

    FileResult {
        outcome,
        symbols_found: !decoded.result.is_empty(),
        roi_scans: decoded.roi_scans,
    }
}

/// A panic inside the decoder costs one file, not the run.
fn decoder_panicked(path: &Path, payload: &(dyn Any + Send)) -> FileResult {
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    warn!(file = %path.display(), "Decoder panicked, recording as invalid image: {message}");
    FileResult::invalid()
}

//! Plain-text run report
//!
//! One line per processed image followed by a two-line summary:
//!
//! ```text
//! 1 / 3 : a.png | HELLO
//! 2 / 3 : b.png | Unable to decode
//! 3 / 3 : c.png | Invalid image
//! Total read: 1
//! Time elapsed: 0 s.
//! ```

use crate::batch::{BatchRecord, BatchSummary, RecordSink};
use crate::error::{Error, Result};
use crate::policy::PolicyKind;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Marker written for files that are not images
pub const INVALID_IMAGE: &str = "Invalid image";

/// Marker written for images without a reportable symbol
pub const DECODE_FAILED: &str = "Unable to decode";

/// Default leading component of report file names
pub const DEFAULT_REPORT_PREFIX: &str = "barscan-report";

/// Summary lines closing a report. Elapsed time is whole seconds, truncated.
pub fn summary_lines(decoded: usize, elapsed: Duration) -> [String; 2] {
    [
        format!("Total read: {decoded}"),
        format!("Time elapsed: {} s.", elapsed.as_secs()),
    ]
}

/// Report file name for a run: `<prefix>-<total>-<label>-<suffix>.txt`
pub fn report_file_name(prefix: &str, total: usize, label: &str, policy: PolicyKind) -> String {
    format!("{prefix}-{total}-{label}-{}.txt", policy.report_suffix())
}

/// Report written to disk, one flushed line per record.
pub struct ReportFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ReportFile {
    /// Create (or truncate) the report. Fails before any file is processed.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| {
            Error::Report(format!("Unable to open log file {}: {e}", path.display()))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Where the report is written
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{line}")
            .and_then(|_| self.writer.flush())
            .map_err(|e| Error::Report(format!("Failed to write {}: {e}", self.path.display())))
    }
}

impl RecordSink for ReportFile {
    fn record(&mut self, record: &BatchRecord) -> Result<()> {
        self.write_line(&record.to_string())
    }

    fn summary(&mut self, summary: &BatchSummary) -> Result<()> {
        for line in summary.lines() {
            self.write_line(&line)?;
        }
        Ok(())
    }
}

/// Live record stream for a terminal or pipe, as report lines or JSON lines.
///
/// Write errors (a closed pipe included) surface as [`Error::Io`] so the run
/// stops instead of panicking.
pub struct RecordStream<W: Write> {
    writer: W,
    json: bool,
}

impl<W: Write> RecordStream<W> {
    /// Stream report lines to `writer`
    pub fn text(writer: W) -> Self {
        Self {
            writer,
            json: false,
        }
    }

    /// Stream one JSON object per line to `writer`
    pub fn json(writer: W) -> Self {
        Self { writer, json: true }
    }

    /// Hand back the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for RecordStream<W> {
    fn record(&mut self, record: &BatchRecord) -> Result<()> {
        if self.json {
            writeln!(self.writer, "{}", serde_json::to_string(record)?)?;
        } else {
            writeln!(self.writer, "{record}")?;
        }
        Ok(())
    }

    fn summary(&mut self, summary: &BatchSummary) -> Result<()> {
        if self.json {
            writeln!(self.writer, "{}", serde_json::to_string(summary)?)?;
        } else {
            for line in summary.lines() {
                writeln!(self.writer, "{line}")?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

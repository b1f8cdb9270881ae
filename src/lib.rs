//! barscan - batch barcode decoding harness
//!
//! Runs a symbol decoder over a directory (or manifest) of still images and
//! records, per image, whether anything was decoded.
//!
//! # Features
//!
//! - **Two policies**: a single full-image scan, or an iterative fallback that
//!   sweeps overlapping regions at shrinking sizes when the full scan fails
//! - **Pluggable decoder**: anything implementing [`SymbolDecoder`]; a
//!   multi-symbology [`ZbarDecoder`] (zedbar) and a QR-only [`QrDecoder`]
//!   (rqrr) ship with the crate
//! - **Streaming output**: one [`BatchRecord`] per file as soon as it is
//!   decoded, plus a plain-text report on disk
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use barscan::{BarscanConfig, BatchRunner, BatchRecord, Source, ZbarDecoder, store};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = Source::Directory("./images".into());
//!     let run = BarscanConfig::default().run_config(source.clone())?;
//!     let files = store::list_files(&source)?;
//!
//!     let runner = BatchRunner::new(Arc::new(ZbarDecoder::new()), run);
//!     let mut records: Vec<BatchRecord> = Vec::new();
//!     let summary = runner.run(&files, &mut records).await?;
//!
//!     println!("decoded {} of {}", summary.decoded, summary.total);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]

pub mod batch;
pub mod config;
pub mod decoder;
pub mod error;
pub mod gray;
pub mod logging;
pub mod policy;
pub mod report;
pub mod sample;
pub mod store;

// Re-exports for convenience
pub use error::{Error, Result};

pub use batch::{BatchRecord, BatchRunner, BatchSummary, CancelFlag, Outcome, RecordSink};
pub use config::{BarscanConfig, LogRotation, LoggingOptions, RunConfig, ScanOptions};
pub use decoder::{
    Backend, DecodeResult, DecodedSymbol, QrDecoder, SymbolDecoder, SymbolFilter, ZbarDecoder,
};
pub use gray::{GrayscaleBuffer, to_grayscale};
pub use policy::{DecodePolicy, PolicyKind, RoiSweep};
pub use report::{RecordStream, ReportFile};
pub use store::Source;

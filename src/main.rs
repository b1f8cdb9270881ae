//! barscan command-line entrypoint

use anyhow::Context;
use barscan::batch::{BatchRecord, BatchSummary, CancelFlag, RecordSink};
use barscan::{
    Backend, BarscanConfig, BatchRunner, PolicyKind, RecordStream, ReportFile, Source, logging,
    sample, store,
};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "barscan",
    version,
    about = "Batch barcode decoding over directories of still images"
)]
struct Cli {
    /// Optional configuration file (toml/yaml). Defaults to barscan.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode every listed image and write a report
    Decode(DecodeArgs),
    /// Write a manifest of randomly chosen images from a directory
    Sample(SampleArgs),
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Directory of png/jpeg/jpg/bmp images
    #[arg(long, value_name = "DIR", conflicts_with = "manifest", required_unless_present = "manifest")]
    dir: Option<PathBuf>,

    /// Text file listing one image path per line
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Fall back to the region sweep when a full-image scan finds nothing
    #[arg(long)]
    iterative: bool,

    /// Decoding engine: zbar (all symbologies) or qr (rqrr, QR only)
    #[arg(long, value_name = "NAME")]
    backend: Option<String>,

    /// Directory receiving the report file
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Report QR-Code symbols instead of excluding them
    #[arg(long)]
    include_qr: bool,

    /// Decode on the main task instead of a blocking worker
    #[arg(long)]
    inline: bool,

    /// Print records as JSON lines instead of report lines
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct SampleArgs {
    /// Directory to sample from
    #[arg(long, value_name = "DIR")]
    dir: PathBuf,

    /// Number of distinct images to pick
    #[arg(long, value_name = "N")]
    count: usize,
}

/// Report file plus live terminal display
struct OutputSinks {
    report: ReportFile,
    stdout: RecordStream<io::StdoutLock<'static>>,
}

impl RecordSink for OutputSinks {
    fn record(&mut self, record: &BatchRecord) -> barscan::Result<()> {
        self.report.record(record)?;
        self.stdout.record(record)
    }

    fn summary(&mut self, summary: &BatchSummary) -> barscan::Result<()> {
        self.report.summary(summary)?;
        self.stdout.summary(summary)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = BarscanConfig::load(cli.config.as_deref())?;
    logging::init(&config.logging)?;

    match cli.command {
        Command::Decode(args) => {
            if args.iterative {
                config.scan.policy = PolicyKind::Iterative;
            }
            if let Some(name) = args.backend.as_deref() {
                config.scan.backend = Backend::parse(name)
                    .ok_or_else(|| anyhow::anyhow!("unknown backend '{name}', expected zbar or qr"))?;
            }
            if let Some(dir) = args.output_dir.clone() {
                config.report.output_dir = dir;
            }
            if args.include_qr {
                config.scan.exclude_types.clear();
            }
            if args.inline {
                config.scan.background = false;
            }
            handle_decode(config, args).await
        }
        Command::Sample(args) => {
            let path = sample::write_sample_manifest(&args.dir, args.count, &mut rand::rng())?;
            writeln!(io::stdout().lock(), "{}", path.display())?;
            Ok(())
        }
    }
}

async fn handle_decode(config: BarscanConfig, args: DecodeArgs) -> anyhow::Result<()> {
    let source = match (args.dir, args.manifest) {
        (Some(dir), _) => Source::Directory(dir),
        (None, Some(manifest)) => Source::Manifest(manifest),
        (None, None) => anyhow::bail!("either --dir or --manifest is required"),
    };

    let run = config.run_config(source)?;
    let files = store::list_files(&run.source)?;
    let report_path = run.report_path(files.len());
    let report = ReportFile::create(&report_path)?;
    info!(report = %report_path.display(), files = files.len(), "Writing report");

    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current file");
            on_signal.cancel();
        }
    });

    let decoder = config.scan.backend.decoder();
    info!(backend = decoder.name(), "Decoder ready");
    let runner = BatchRunner::new(decoder, run).with_cancel_flag(cancel);
    let stdout = if args.json {
        RecordStream::json(io::stdout().lock())
    } else {
        RecordStream::text(io::stdout().lock())
    };
    let mut sinks = OutputSinks { report, stdout };
    let summary = runner
        .run(&files, &mut sinks)
        .await
        .with_context(|| format!("batch over {} files failed", files.len()))?;

    if summary.cancelled {
        eprintln!(
            "Stopped after {} of {} files; partial report at {}",
            summary.processed,
            summary.total,
            report_path.display()
        );
    }
    Ok(())
}

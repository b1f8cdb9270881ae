use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{GrayImage, Luma};

use barscan::batch::{BatchRecord, BatchSummary, CancelFlag, Outcome, RecordSink};
use barscan::{
    BatchRunner, DecodePolicy, DecodedSymbol, GrayscaleBuffer, QrDecoder, ReportFile, RoiSweep,
    RunConfig, Source, SymbolDecoder, SymbolFilter, ZbarDecoder, store,
};

/// Reports a CODE-128 "HELLO" whenever the buffer starts with a dark pixel
/// and is no wider than `max_width`.
struct DarkCornerDecoder {
    max_width: u32,
}

impl SymbolDecoder for DarkCornerDecoder {
    fn name(&self) -> &str {
        "dark-corner"
    }

    fn scan(&self, buffer: &GrayscaleBuffer) -> Vec<DecodedSymbol> {
        if buffer.width() <= self.max_width && buffer.sample(0, 0) < 128 {
            vec![DecodedSymbol::new("CODE-128", "HELLO")]
        } else {
            Vec::new()
        }
    }
}

fn full_frame() -> Arc<dyn SymbolDecoder> {
    Arc::new(DarkCornerDecoder {
        max_width: u32::MAX,
    })
}

fn write_png(path: &Path, size: u32, dark_corner: bool) {
    let image = GrayImage::from_fn(size, size, |x, y| {
        if dark_corner && x < 20 && y < 20 {
            Luma([0])
        } else {
            Luma([255])
        }
    });
    image.save(path).expect("write test image");
}

fn lines(records: &[BatchRecord]) -> Vec<String> {
    records.iter().map(ToString::to_string).collect()
}

/// Three images, only `b.png` carries a symbol.
fn sample_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write_png(&dir.path().join("a.png"), 64, false);
    write_png(&dir.path().join("b.png"), 64, true);
    write_png(&dir.path().join("c.png"), 64, false);
    dir
}

async fn run_dir(
    decoder: Arc<dyn SymbolDecoder>,
    config: RunConfig,
) -> (Vec<BatchRecord>, BatchSummary) {
    let files = store::list_files(&config.source).expect("list files");
    let mut records: Vec<BatchRecord> = Vec::new();
    let summary = BatchRunner::new(decoder, config)
        .run(&files, &mut records)
        .await
        .expect("run batch");
    (records, summary)
}

#[tokio::test]
async fn direct_run_over_directory_writes_report() {
    let dir = sample_dir();
    let config = RunConfig::new(
        Source::Directory(dir.path().to_path_buf()),
        DecodePolicy::Direct,
    );
    let files = store::list_files(&config.source).expect("list files");
    let report_path = dir.path().join("report.txt");
    let mut report = ReportFile::create(&report_path).expect("create report");

    let summary = BatchRunner::new(full_frame(), config)
        .run(&files, &mut report)
        .await
        .expect("run batch");
    drop(report);

    assert_eq!(summary.decoded, 1);
    assert_eq!(summary.not_decoded, 2);
    assert_eq!(summary.invalid, 0);
    assert!(!summary.cancelled);

    let contents = fs::read_to_string(&report_path).expect("read report");
    let report_lines: Vec<&str> = contents.lines().collect();
    assert_eq!(report_lines.len(), 5);
    assert_eq!(report_lines[0], "1 / 3 : a.png | Unable to decode");
    assert_eq!(report_lines[1], "2 / 3 : b.png | HELLO");
    assert_eq!(report_lines[2], "3 / 3 : c.png | Unable to decode");
    assert_eq!(report_lines[3], "Total read: 1");
    assert!(report_lines[4].starts_with("Time elapsed: "));
    assert!(report_lines[4].ends_with(" s."));
}

#[tokio::test]
async fn missing_manifest_entry_is_invalid_image() {
    let dir = sample_dir();
    let manifest = dir.path().join("list.txt");
    let missing = dir.path().join("gone.png");
    fs::write(
        &manifest,
        format!(
            "{}\n\n{}\n",
            dir.path().join("b.png").display(),
            missing.display()
        ),
    )
    .expect("write manifest");

    let config = RunConfig::new(Source::Manifest(manifest), DecodePolicy::Direct);
    let (records, summary) = run_dir(full_frame(), config).await;

    assert_eq!(
        lines(&records),
        vec!["1 / 2 : b.png | HELLO", "2 / 2 : gone.png | Invalid image"]
    );
    assert_eq!(summary.invalid, 1);
    assert_eq!(summary.processed, 2);
}

#[tokio::test]
async fn non_image_file_is_invalid_image() {
    let dir = sample_dir();
    fs::write(dir.path().join("d.png"), b"not really a png").expect("write junk");

    let mut config = RunConfig::new(
        Source::Directory(dir.path().to_path_buf()),
        DecodePolicy::Direct,
    );
    config.background = false;
    let (records, summary) = run_dir(full_frame(), config).await;

    assert_eq!(records.len(), 4);
    assert_eq!(records[3].outcome, Outcome::InvalidImage);
    assert_eq!(summary.decoded, 1);
}

#[tokio::test]
async fn repeated_runs_give_identical_records() {
    let dir = sample_dir();
    let config = RunConfig::new(
        Source::Directory(dir.path().to_path_buf()),
        DecodePolicy::Iterative(RoiSweep::default()),
    );

    let (first, _) = run_dir(full_frame(), config.clone()).await;
    let (second, _) = run_dir(full_frame(), config).await;
    assert_eq!(lines(&first), lines(&second));
}

#[tokio::test]
async fn iterative_finds_symbol_only_visible_in_regions() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_png(&dir.path().join("shelf.png"), 300, true);
    let decoder: Arc<dyn SymbolDecoder> = Arc::new(DarkCornerDecoder { max_width: 150 });

    let direct = RunConfig::new(
        Source::Directory(dir.path().to_path_buf()),
        DecodePolicy::Direct,
    );
    let (records, summary) = run_dir(Arc::clone(&decoder), direct).await;
    assert_eq!(records[0].outcome, Outcome::NotDecoded);
    assert_eq!(summary.roi_scans, 0);

    let iterative = RunConfig::new(
        Source::Directory(dir.path().to_path_buf()),
        DecodePolicy::Iterative(RoiSweep::default()),
    );
    let (records, summary) = run_dir(decoder, iterative).await;
    assert_eq!(records[0].outcome, Outcome::Decoded("HELLO".to_string()));
    assert_eq!(summary.decoded, 1);
    // 4 passes x 6 x 6 origins
    assert_eq!(summary.roi_scans, 144);
}

#[tokio::test]
async fn qr_only_results_are_not_reported_but_count_as_read() {
    struct QrOnly;
    impl SymbolDecoder for QrOnly {
        fn name(&self) -> &str {
            "qr-only"
        }
        fn scan(&self, _buffer: &GrayscaleBuffer) -> Vec<DecodedSymbol> {
            vec![DecodedSymbol::new("QR-Code", "ignored")]
        }
    }

    let dir = sample_dir();
    let config = RunConfig::new(
        Source::Directory(dir.path().to_path_buf()),
        DecodePolicy::Iterative(RoiSweep::default()),
    );
    let (records, summary) = run_dir(Arc::new(QrOnly), config).await;

    assert!(records.iter().all(|r| r.outcome == Outcome::NotDecoded));
    assert_eq!(summary.not_decoded, 3);
    // Total read counts images with any symbol, filtered or not.
    assert_eq!(summary.decoded, 3);
    assert_eq!(summary.lines()[0], "Total read: 3");
    // Stage one found a symbol, so no sweep ran.
    assert_eq!(summary.roi_scans, 0);
}

/// Panics on one chosen call and otherwise finds nothing.
struct PanicsOnScan {
    calls: AtomicUsize,
    fatal_call: usize,
}

impl SymbolDecoder for PanicsOnScan {
    fn name(&self) -> &str {
        "panics-on-scan"
    }

    fn scan(&self, _buffer: &GrayscaleBuffer) -> Vec<DecodedSymbol> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == self.fatal_call {
            panic!("decoder blew up");
        }
        Vec::new()
    }
}

async fn run_with_panicking_decoder(background: bool) {
    let dir = sample_dir();
    let mut config = RunConfig::new(
        Source::Directory(dir.path().to_path_buf()),
        DecodePolicy::Direct,
    );
    config.background = background;
    let decoder = Arc::new(PanicsOnScan {
        calls: AtomicUsize::new(0),
        fatal_call: 1,
    });

    let (records, summary) = run_dir(decoder, config).await;

    assert_eq!(
        lines(&records),
        vec![
            "1 / 3 : a.png | Unable to decode",
            "2 / 3 : b.png | Invalid image",
            "3 / 3 : c.png | Unable to decode",
        ]
    );
    assert_eq!(summary.invalid, 1);
    assert_eq!(summary.processed, 3);
    assert!(!summary.cancelled);
}

#[tokio::test]
async fn decoder_panic_on_worker_skips_only_that_file() {
    run_with_panicking_decoder(true).await;
}

#[tokio::test]
async fn decoder_panic_inline_skips_only_that_file() {
    run_with_panicking_decoder(false).await;
}

#[tokio::test]
async fn cancellation_stops_at_file_boundary() {
    struct CancelAfterFirst {
        flag: CancelFlag,
        seen: Vec<BatchRecord>,
    }
    impl RecordSink for CancelAfterFirst {
        fn record(&mut self, record: &BatchRecord) -> barscan::Result<()> {
            self.seen.push(record.clone());
            self.flag.cancel();
            Ok(())
        }
    }

    let dir = sample_dir();
    let config = RunConfig::new(
        Source::Directory(dir.path().to_path_buf()),
        DecodePolicy::Direct,
    );
    let files = store::list_files(&config.source).expect("list files");
    let runner = BatchRunner::new(full_frame(), config);
    let mut sink = CancelAfterFirst {
        flag: runner.cancel_flag(),
        seen: Vec::new(),
    };

    let summary = runner.run(&files, &mut sink).await.expect("run batch");
    assert!(summary.cancelled);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.total, 3);
    assert_eq!(sink.seen.len(), 1);
}

#[tokio::test]
async fn qr_backend_decodes_rendered_code() {
    let dir = tempfile::tempdir().expect("tempdir");
    let code = qrcode::QrCode::new(b"barscan batch").expect("encode qr");
    let rendered = code
        .render::<Luma<u8>>()
        .min_dimensions(400, 400)
        .build();
    rendered
        .save(dir.path().join("code.png"))
        .expect("write qr image");

    let mut config = RunConfig::new(
        Source::Directory(dir.path().to_path_buf()),
        DecodePolicy::Direct,
    );
    let (records, _) = run_dir(Arc::new(QrDecoder::new()), config.clone()).await;
    assert_eq!(records[0].outcome, Outcome::NotDecoded);

    config.filter = SymbolFilter::allow_all();
    let (records, summary) = run_dir(Arc::new(QrDecoder::new()), config).await;
    assert_eq!(
        records[0].outcome,
        Outcome::Decoded("barscan batch".to_string())
    );
    assert_eq!(summary.decoded, 1);
}

/// Left-hand odd-parity patterns for digits 0-9; the other two sets derive from these.
const EAN_L: [&str; 10] = [
    "0001101", "0011001", "0010011", "0111101", "0100011", "0110001", "0101111", "0111011",
    "0110111", "0001011",
];

/// Parity of the six left-hand digits, selected by the leading digit.
const EAN_PARITY: [&str; 10] = [
    "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG", "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL",
    "LGGLGL",
];

fn ean13_modules(code: &str) -> String {
    let digits: Vec<usize> = code
        .chars()
        .map(|c| c.to_digit(10).expect("digit") as usize)
        .collect();
    assert_eq!(digits.len(), 13);

    let right = |d: usize| -> String {
        EAN_L[d]
            .chars()
            .map(|c| if c == '0' { '1' } else { '0' })
            .collect()
    };
    let even = |d: usize| -> String { right(d).chars().rev().collect() };

    let mut modules = String::from("101");
    for (digit, parity) in digits[1..7].iter().zip(EAN_PARITY[digits[0]].chars()) {
        if parity == 'L' {
            modules.push_str(EAN_L[*digit]);
        } else {
            modules.push_str(&even(*digit));
        }
    }
    modules.push_str("01010");
    for digit in &digits[7..] {
        modules.push_str(&right(*digit));
    }
    modules.push_str("101");
    modules
}

/// Black-on-white EAN-13 with a quiet zone, `module` pixels per bar unit.
fn render_ean13(code: &str, module: u32) -> GrayImage {
    let modules: Vec<bool> = ean13_modules(code).chars().map(|c| c == '1').collect();
    assert_eq!(modules.len(), 95);
    let quiet = 12;
    let width = (modules.len() as u32 + 2 * quiet) * module;
    GrayImage::from_fn(width, 100, |x, _| {
        let unit = (x / module) as i64 - quiet as i64;
        let dark = unit >= 0 && modules.get(unit as usize).copied().unwrap_or(false);
        if dark { Luma([0]) } else { Luma([255]) }
    })
}

#[tokio::test]
async fn zbar_backend_decodes_rendered_ean13() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rendered = render_ean13("5901234123457", 3);
    rendered
        .save(dir.path().join("can.png"))
        .expect("write barcode image");

    let buffer = GrayscaleBuffer::new(rendered.width(), rendered.height(), rendered.into_raw())
        .expect("gray buffer");
    let symbols = ZbarDecoder::new().scan(&buffer);
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].kind, "EAN-13");
    assert_eq!(symbols[0].text(), "5901234123457");

    let config = RunConfig::new(
        Source::Directory(dir.path().to_path_buf()),
        DecodePolicy::Direct,
    );
    let (records, summary) = run_dir(Arc::new(ZbarDecoder::new()), config).await;
    assert_eq!(lines(&records), vec!["1 / 1 : can.png | 5901234123457"]);
    assert_eq!(summary.decoded, 1);
}

#[test]
fn report_path_follows_naming_convention() {
    let config = RunConfig::new(
        Source::Directory(PathBuf::from("/data/shelf")),
        DecodePolicy::Iterative(RoiSweep::default()),
    );
    assert_eq!(
        config.report_path(42),
        PathBuf::from("./barscan-report-42-shelf-force-decode.txt")
    );
}

//! Symbol decoder boundary and result formatting
//!
//! A [`SymbolDecoder`] turns one grayscale buffer into zero or more
//! [`DecodedSymbol`]s. Each call is an independent decoding context; pooling
//! results across calls is the caller's business.

mod qr;
mod zbar;

pub use qr::QrDecoder;
pub use zbar::ZbarDecoder;

use crate::gray::GrayscaleBuffer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Symbol kind reported for QR codes
pub const QR_CODE: &str = "QR-Code";

/// Separator placed between payloads of one image
pub const SYMBOL_DELIMITER: &str = " | ";

/// Replacement for newlines inside a payload
pub const LINE_BREAK_MARKER: &str = "<br>";

/// A barcode symbol found by the decoder
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecodedSymbol {
    /// Symbology tag, e.g. `"QR-Code"` or `"CODE-128"`
    pub kind: String,
    /// Raw payload
    pub data: Vec<u8>,
}

impl DecodedSymbol {
    /// Create a symbol from a kind tag and raw payload bytes
    pub fn new(kind: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: kind.into(),
            data: data.into(),
        }
    }

    /// Payload as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Interface to a barcode decoding engine.
pub trait SymbolDecoder: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Scan the whole buffer and return every symbol found, in detection order.
    fn scan(&self, buffer: &GrayscaleBuffer) -> Vec<DecodedSymbol>;
}

/// Decoding engines shipped with the crate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Every symbology zedbar knows (EAN/UPC, CODE-128, CODE-39, QR, ...)
    #[default]
    Zbar,
    /// QR codes only, via rqrr
    Qr,
}

impl Backend {
    /// Parse a backend name as used on the command line and in `BARSCAN_BACKEND`
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "zbar" | "zedbar" => Some(Self::Zbar),
            "qr" | "rqrr" => Some(Self::Qr),
            _ => None,
        }
    }

    /// Build a decoder for this backend
    pub fn decoder(self) -> Arc<dyn SymbolDecoder> {
        match self {
            Self::Zbar => Arc::new(ZbarDecoder::new()),
            Self::Qr => Arc::new(QrDecoder::new()),
        }
    }
}

/// Ordered symbols found for one image. Empty means nothing was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeResult {
    symbols: Vec<DecodedSymbol>,
}

impl DecodeResult {
    /// Result with no symbols
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add symbols from one more scan, skipping any `(kind, data)` pair already held.
    pub fn merge(&mut self, symbols: Vec<DecodedSymbol>) {
        for symbol in symbols {
            if !self.symbols.contains(&symbol) {
                self.symbols.push(symbol);
            }
        }
    }

    /// True when the decoder found nothing
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Number of symbols held
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Symbols in detection order
    pub fn symbols(&self) -> &[DecodedSymbol] {
        &self.symbols
    }
}

impl From<Vec<DecodedSymbol>> for DecodeResult {
    fn from(symbols: Vec<DecodedSymbol>) -> Self {
        Self { symbols }
    }
}

/// Decides which symbol kinds are reported in the output text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolFilter {
    excluded: Vec<String>,
}

impl SymbolFilter {
    /// Exclude the given kinds (compared after trimming the symbol's tag)
    pub fn excluding<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: kinds.into_iter().map(Into::into).collect(),
        }
    }

    /// Report every kind
    pub fn allow_all() -> Self {
        Self {
            excluded: Vec::new(),
        }
    }

    /// Whether `symbol` contributes to the output text
    pub fn qualifies(&self, symbol: &DecodedSymbol) -> bool {
        let kind = symbol.kind.trim();
        !self.excluded.iter().any(|excluded| excluded == kind)
    }
}

impl Default for SymbolFilter {
    fn default() -> Self {
        Self::excluding([QR_CODE])
    }
}

/// Join qualifying payloads into the single line written to the report.
///
/// Returns an empty string when no symbol qualifies.
pub fn format_symbols(result: &DecodeResult, filter: &SymbolFilter) -> String {
    result
        .symbols()
        .iter()
        .filter(|symbol| filter.qualifies(symbol))
        .map(|symbol| symbol.text().replace('\n', LINE_BREAK_MARKER))
        .collect::<Vec<_>>()
        .join(SYMBOL_DELIMITER)
}

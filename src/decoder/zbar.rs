//! Multi-symbology decoder using zedbar

use crate::decoder::{DecodedSymbol, SymbolDecoder};
use crate::gray::GrayscaleBuffer;
use zedbar::config::{Isbn10, Isbn13, Upca, Upce};
use zedbar::{DecoderConfig, Image, Scanner};

/// 1-D and 2-D barcode backend.
///
/// Symbol kinds are zbar's type names (`"EAN-13"`, `"CODE-128"`, `"QR-Code"`, ...).
pub struct ZbarDecoder {
    config: DecoderConfig,
}

impl ZbarDecoder {
    /// Decoder with every linear symbology plus QR enabled
    pub fn new() -> Self {
        Self::with_config(
            DecoderConfig::new()
                .enable(Upca)
                .enable(Upce)
                .enable(Isbn10)
                .enable(Isbn13),
        )
    }

    /// Decoder with a caller supplied symbology selection
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }
}

impl Default for ZbarDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolDecoder for ZbarDecoder {
    fn name(&self) -> &str {
        "zedbar"
    }

    fn scan(&self, buffer: &GrayscaleBuffer) -> Vec<DecodedSymbol> {
        if buffer.is_empty() {
            return Vec::new();
        }

        // zbar wants a packed Y800 plane
        let packed = buffer.to_gray_image();
        let mut image = match Image::from_gray(packed.as_raw(), buffer.width(), buffer.height()) {
            Ok(image) => image,
            Err(e) => {
                tracing::trace!("Rejected {}x{} buffer: {}", buffer.width(), buffer.height(), e);
                return Vec::new();
            }
        };

        // A fresh scanner per call keeps scans independent
        let mut scanner = Scanner::with_config(self.config.clone());
        let mut symbols = Vec::new();
        for symbol in scanner.scan(&mut image) {
            let kind = symbol.symbol_type().to_string();
            let mut data = symbol.data().to_vec();
            while data.last() == Some(&0) {
                data.pop();
            }
            tracing::trace!("Decoded {}: length={}", kind, data.len());
            symbols.push(DecodedSymbol::new(kind, data));
        }

        symbols
    }
}

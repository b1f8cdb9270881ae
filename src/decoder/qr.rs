//! QR symbol decoder using rqrr

use crate::decoder::{DecodedSymbol, QR_CODE, SymbolDecoder};
use crate::gray::GrayscaleBuffer;

/// QR decoder backend
pub struct QrDecoder {
    // Stateless: every scan prepares its own rqrr image
}

impl QrDecoder {
    /// Create a new QR decoder with default settings
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for QrDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolDecoder for QrDecoder {
    fn name(&self) -> &str {
        "rqrr"
    }

    fn scan(&self, buffer: &GrayscaleBuffer) -> Vec<DecodedSymbol> {
        if buffer.is_empty() {
            return Vec::new();
        }

        let mut prepared = rqrr::PreparedImage::prepare(buffer.to_gray_image());
        let grids = prepared.detect_grids();

        let mut symbols = Vec::with_capacity(grids.len());
        for grid in grids {
            match grid.decode() {
                Ok((meta, content)) => {
                    tracing::trace!(
                        "Decoded QR: version={:?}, ecc_level={:?}, length={}",
                        meta.version,
                        meta.ecc_level,
                        content.len()
                    );
                    symbols.push(DecodedSymbol::new(QR_CODE, content.into_bytes()));
                }
                Err(e) => {
                    tracing::trace!("Failed to decode one QR grid: {:?}", e);
                }
            }
        }

        symbols
    }
}

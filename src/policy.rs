//! Direct and iterative decode policies
//!
//! The direct policy scans the full image once. The iterative policy falls back
//! to a region-of-interest sweep when that single scan finds nothing: the image
//! is covered with overlapping windows at a series of shrinking sizes and every
//! window is scanned, with all detections pooled for the image.

use crate::decoder::{DecodeResult, SymbolDecoder};
use crate::error::{Error, Result};
use crate::gray::GrayscaleBuffer;
use serde::{Deserialize, Serialize};

/// Default spacing between window origins, in pixels
pub const DEFAULT_TILE_STRIDE: u32 = 50;

/// Default exclusive upper bound on the divisor sequence
pub const DEFAULT_DIVISOR_LIMIT: u32 = 11;

/// Policy selector as written in configuration and on the command line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// One full-image scan
    Direct,
    /// Full-image scan with a region sweep fallback
    Iterative,
}

impl PolicyKind {
    /// Parse a policy name (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "direct" => Some(Self::Direct),
            "iterative" => Some(Self::Iterative),
            _ => None,
        }
    }

    /// Suffix distinguishing report files of the two policies
    pub fn report_suffix(self) -> &'static str {
        match self {
            Self::Direct => "decode",
            Self::Iterative => "force-decode",
        }
    }
}

/// Geometry of the region sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiSweep {
    tile_stride: u32,
    divisor_limit: u32,
}

impl RoiSweep {
    /// Build a sweep, rejecting a zero stride or a limit that yields no divisors.
    pub fn new(tile_stride: u32, divisor_limit: u32) -> Result<Self> {
        if tile_stride == 0 {
            return Err(Error::Config("tile stride must be at least 1".to_string()));
        }
        if divisor_limit <= 2 {
            return Err(Error::Config(format!(
                "divisor limit {divisor_limit} leaves no region sizes, use 3 or more"
            )));
        }
        Ok(Self {
            tile_stride,
            divisor_limit,
        })
    }

    /// Spacing between window origins
    pub fn tile_stride(&self) -> u32 {
        self.tile_stride
    }

    /// Divisors applied to the image size, one sweep pass each.
    ///
    /// Fibonacci numbers after the leading `1, 1`, below the limit.
    pub fn divisors(&self) -> Vec<u32> {
        let mut divisors = Vec::new();
        let (mut a, mut b) = (1u32, 1u32);
        loop {
            let next = a.saturating_add(b);
            if next >= self.divisor_limit {
                break;
            }
            divisors.push(next);
            a = b;
            b = next;
        }
        divisors
    }

    /// Window origins for an image of the given size, x-major.
    pub fn tile_origins(&self, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
        let step = self.tile_stride as usize;
        (0..width)
            .step_by(step)
            .flat_map(move |x| (0..height).step_by(step).map(move |y| (x, y)))
    }

    /// Run every pass over `buffer`, merging detections into `pool`.
    ///
    /// Returns the number of decoder calls made.
    fn sweep(
        &self,
        decoder: &dyn SymbolDecoder,
        buffer: &GrayscaleBuffer,
        pool: &mut DecodeResult,
    ) -> u64 {
        let (width, height) = (buffer.width(), buffer.height());
        let mut scans = 0u64;

        for divisor in self.divisors() {
            let roi_w = width / divisor;
            let roi_h = height / divisor;
            let before = pool.len();

            for (x, y) in self.tile_origins(width, height) {
                if let Some(region) = buffer.region(x, y, roi_w, roi_h) {
                    pool.merge(decoder.scan(&region));
                    scans += 1;
                }
            }

            tracing::trace!(
                divisor,
                roi_w,
                roi_h,
                found = pool.len() - before,
                "ROI pass complete"
            );
        }

        scans
    }
}

impl Default for RoiSweep {
    fn default() -> Self {
        Self {
            tile_stride: DEFAULT_TILE_STRIDE,
            divisor_limit: DEFAULT_DIVISOR_LIMIT,
        }
    }
}

/// Decoded symbols for one image plus the work spent finding them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyOutcome {
    /// Pooled symbols
    pub result: DecodeResult,
    /// Decoder calls made on sub-regions (zero when no sweep ran)
    pub roi_scans: u64,
}

/// How one grayscale image is handed to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Scan the full buffer once
    Direct,
    /// Scan once, then sweep regions if nothing was found
    Iterative(RoiSweep),
}

impl DecodePolicy {
    /// Build the policy selected by `kind`
    pub fn from_kind(kind: PolicyKind, sweep: RoiSweep) -> Self {
        match kind {
            PolicyKind::Direct => Self::Direct,
            PolicyKind::Iterative => Self::Iterative(sweep),
        }
    }

    /// Selector for this policy
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Direct => PolicyKind::Direct,
            Self::Iterative(_) => PolicyKind::Iterative,
        }
    }

    /// Decode one image. The pool starts empty for every call.
    pub fn decode(&self, decoder: &dyn SymbolDecoder, buffer: &GrayscaleBuffer) -> PolicyOutcome {
        let result = DecodeResult::from(decoder.scan(buffer));

        match self {
            Self::Direct => PolicyOutcome {
                result,
                roi_scans: 0,
            },
            Self::Iterative(_) if !result.is_empty() => PolicyOutcome {
                result,
                roi_scans: 0,
            },
            Self::Iterative(sweep) => {
                let mut pool = result;
                let roi_scans = sweep.sweep(decoder, buffer, &mut pool);
                tracing::debug!(
                    roi_scans,
                    symbols = pool.len(),
                    "full-image scan empty, region sweep finished"
                );
                PolicyOutcome {
                    result: pool,
                    roi_scans,
                }
            }
        }
    }
}

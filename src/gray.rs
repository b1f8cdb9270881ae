//! Grayscale conversion and region extraction
//!
//! The decoder only understands single-channel 8-bit samples, so every loaded
//! image is reduced to a [`GrayscaleBuffer`] before any scan.

use crate::error::{Error, Result};
use image::{DynamicImage, GrayImage};

/// Immutable 8-bit grayscale pixel buffer.
///
/// Invariants: `data.len() == stride * height` and `stride >= width`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayscaleBuffer {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl GrayscaleBuffer {
    /// Create a tightly packed buffer (stride equals width).
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::with_stride(width, height, width as usize, data)
    }

    /// Create a buffer whose rows are `stride` bytes apart.
    pub fn with_stride(width: u32, height: u32, stride: usize, data: Vec<u8>) -> Result<Self> {
        if stride < width as usize {
            return Err(Error::Image(format!(
                "stride {stride} is smaller than width {width}"
            )));
        }
        let expected = stride
            .checked_mul(height as usize)
            .ok_or_else(|| Error::Image(format!("buffer {stride}x{height} overflows")))?;
        if data.len() != expected {
            return Err(Error::Image(format!(
                "buffer holds {} bytes, expected {expected} ({stride} x {height})",
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Distance between the starts of two rows, in bytes
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Raw samples including any row padding
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// True when the buffer has no pixels to scan
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Sample at `(x, y)`. Panics when out of bounds.
    pub fn sample(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.stride + x as usize]
    }

    /// One row of visible samples, without padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize]
    }

    /// Copy out the window with top-left corner `(x, y)` and size `width x height`.
    ///
    /// A window running past the right or bottom edge is clamped by shrinking
    /// the copied size; the origin is never moved. Returns `None` when nothing
    /// of the window lies inside the image.
    pub fn region(&self, x: u32, y: u32, width: u32, height: u32) -> Option<GrayscaleBuffer> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let copy_w = width.min(self.width - x);
        let copy_h = height.min(self.height - y);
        if copy_w == 0 || copy_h == 0 {
            return None;
        }

        let mut data = Vec::with_capacity(copy_w as usize * copy_h as usize);
        for row in y..y + copy_h {
            let start = row as usize * self.stride + x as usize;
            data.extend_from_slice(&self.data[start..start + copy_w as usize]);
        }

        Some(GrayscaleBuffer {
            width: copy_w,
            height: copy_h,
            stride: copy_w as usize,
            data,
        })
    }

    /// Tightly packed copy as an `image` crate buffer.
    pub fn to_gray_image(&self) -> GrayImage {
        if self.stride == self.width as usize {
            if let Some(img) = GrayImage::from_raw(self.width, self.height, self.data.clone()) {
                return img;
            }
        }
        GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([self.sample(x, y)])
        })
    }
}

/// Reduce a decoded image to one 8-bit luma sample per pixel.
///
/// Gray levels map through an identity palette (0..=255), rows are packed
/// without padding.
pub fn to_grayscale(image: &DynamicImage) -> GrayscaleBuffer {
    let luma = image.to_luma8();
    let (width, height) = luma.dimensions();
    GrayscaleBuffer {
        width,
        height,
        stride: width as usize,
        data: luma.into_raw(),
    }
}

//! Luminance frame and region types.
//!
//! Frames carry 8-bit grayscale pixels only. Colour conversion happens
//! upstream (e.g. `ffmpeg -pix_fmt gray`) so the scoring path never sees RGB.

use serde::{Deserialize, Serialize};

/// A single captured frame as a row-major luminance buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    luma: Vec<u8>,
}

impl Frame {
    /// Create a frame from a row-major luminance buffer.
    ///
    /// Returns `None` when the buffer length does not match `width * height`.
    pub fn new(width: usize, height: usize, luma: Vec<u8>) -> Option<Self> {
        if width.checked_mul(height)? != luma.len() {
            return None;
        }
        Some(Self {
            width,
            height,
            luma,
        })
    }

    /// Create a frame filled with a single intensity.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            luma: vec![value; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw luminance bytes, row-major.
    pub fn luma(&self) -> &[u8] {
        &self.luma
    }

    /// Copy out the part of `region` that lies inside this frame.
    ///
    /// Regions hanging off the frame edge are clipped; a region entirely
    /// outside yields an empty patch.
    pub fn crop(&self, region: Region) -> LumaPatch {
        let x0 = region.x.min(self.width);
        let y0 = region.y.min(self.height);
        let x1 = region.x.saturating_add(region.width).min(self.width);
        let y1 = region.y.saturating_add(region.height).min(self.height);

        let width = x1 - x0;
        let height = y1 - y0;
        let mut pixels = Vec::with_capacity(width * height);
        for row in y0..y1 {
            let start = row * self.width + x0;
            pixels.extend_from_slice(&self.luma[start..start + width]);
        }

        LumaPatch {
            width,
            height,
            pixels,
        }
    }
}

/// Rectangular region of interest in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Luminance pixels cropped from a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaPatch {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl LumaPatch {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Whether two patches can be compared pixel for pixel.
    pub fn same_shape(&self, other: &LumaPatch) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Rows `[0, h/2)` and `[h/2, h)` as separate slices.
    pub fn split_halves(&self) -> (&[u8], &[u8]) {
        let mid = (self.height / 2) * self.width;
        self.pixels.split_at(mid)
    }
}

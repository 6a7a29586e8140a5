//! Decoded video frames

use serde::{Deserialize, Serialize};

use crate::{DroneError, Result};

/// Pixel layout a video decoder is configured to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelLayout {
    Gray8,
    Rgb24,
    Bgr24,
    Bgra32,
}

impl PixelLayout {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Gray8 => 1,
            PixelLayout::Rgb24 | PixelLayout::Bgr24 => 3,
            PixelLayout::Bgra32 => 4,
        }
    }
}

/// A raw pixel frame.
///
/// Frames are published whole behind an `Arc`; the number and the pixel
/// buffer of one frame are never observed separately. Consumers detect new
/// data by a change of [`number`](Self::number) alone.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    number: u64,
    width: u32,
    height: u32,
    layout: PixelLayout,
    pixels: Vec<u8>,
}

impl VideoFrame {
    /// Build a frame, checking the buffer matches the geometry.
    pub fn new(
        number: u64,
        width: u32,
        height: u32,
        layout: PixelLayout,
        pixels: Vec<u8>,
    ) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|area| area.checked_mul(layout.bytes_per_pixel()))
            .ok_or_else(|| DroneError::decoder_failure("frame dimensions overflow"))?;

        if pixels.len() != expected {
            return Err(DroneError::decoder_failure(format!(
                "{}x{} {:?} frame needs {} bytes, got {}",
                width,
                height,
                layout,
                expected,
                pixels.len()
            )));
        }

        Ok(Self { number, width, height, layout, pixels })
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.layout.bytes_per_pixel()
    }
}

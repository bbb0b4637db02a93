//! Camera frames and region extraction.

use std::sync::Arc;
use std::time::Duration;

use ndarray::{Array3, s};

use crate::tracker::Rect;

/// One captured camera frame.
///
/// Pixels are stored row-major as `(height, width, channels)`. Cloning is cheap;
/// the pixel buffer is shared.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Position of the frame in the capture stream
    pub sequence: u64,
    /// Monotonic capture time
    pub timestamp: Duration,
    pixels: Arc<Array3<u8>>,
}

impl Frame {
    pub fn new(sequence: u64, timestamp: Duration, pixels: Array3<u8>) -> Self {
        Self {
            sequence,
            timestamp,
            pixels: Arc::new(pixels),
        }
    }

    /// A zero-filled frame, handy for collaborators that ignore pixel content.
    pub fn blank(sequence: u64, timestamp: Duration, width: usize, height: usize) -> Self {
        Self::new(sequence, timestamp, Array3::zeros((height, width, 3)))
    }

    pub fn pixels(&self) -> &Array3<u8> {
        &self.pixels
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn channels(&self) -> usize {
        self.pixels.dim().2
    }

    /// Copy out the pixels covered by a normalized box. Boxes outside the frame
    /// are clipped and may yield an empty array.
    pub fn crop(&self, region: &Rect) -> Array3<u8> {
        let (c0, r0, c1, r1) = region.to_pixels(self.width(), self.height());
        self.pixels.slice(s![r0..r1, c0..c1, ..]).to_owned()
    }
}

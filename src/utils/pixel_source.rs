//! Raw pixel access supplied by the camera layer.

use image::{Rgb, RgbImage, RgbaImage};

/// Read access to a frame's pixels
pub trait PixelSource {
    /// Width and height in pixels
    fn dimensions(&self) -> (u32, u32);

    /// RGB value at `(x, y)`. Callers stay within [`PixelSource::dimensions`].
    fn rgb(&self, x: u32, y: u32) -> [u8; 3];
}

impl PixelSource for RgbImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbImage::dimensions(self)
    }

    fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        self.get_pixel(x, y).0
    }
}

impl PixelSource for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbaImage::dimensions(self)
    }

    fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let [r, g, b, _] = self.get_pixel(x, y).0;
        [r, g, b]
    }
}

/// A frame of uniform color, used when replaying recorded keypoint traces
/// where only the overall exposure is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidFrame {
    pub width: u32,
    pub height: u32,
    pub color: [u8; 3],
}

impl SolidFrame {
    pub fn gray(width: u32, height: u32, level: u8) -> Self {
        Self {
            width,
            height,
            color: [level; 3],
        }
    }

    /// Materialize as an image buffer, e.g. for writing captures to disk
    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_pixel(self.width, self.height, Rgb(self.color))
    }
}

impl PixelSource for SolidFrame {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn rgb(&self, _x: u32, _y: u32) -> [u8; 3] {
        self.color
    }
}

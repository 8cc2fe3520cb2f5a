// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// 1-bit raster bitmaps for thermal printers.

use image::GrayImage;
use image::imageops::{self, FilterType};

/// Printable dot width of a 58 mm thermal head at 203 dpi.
pub const THERMAL_DOTS_58MM: u32 = 384;

/// Pixels darker than this are printed.
const BLACK_THRESHOLD: u8 = 128;

/// A packed monochrome bitmap, rows top to bottom, most significant bit
/// leftmost. A set bit is a black dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoBitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl MonoBitmap {
    /// Threshold a grayscale image into a bitmap.
    pub fn from_gray(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let bytes_per_row = width.div_ceil(8) as usize;
        let mut data = vec![0u8; bytes_per_row * height as usize];

        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel.0[0] < BLACK_THRESHOLD {
                let idx = y as usize * bytes_per_row + (x / 8) as usize;
                data[idx] |= 0x80 >> (x % 8);
            }
        }

        Self { width, height, data }
    }

    /// Shrink `image` to at most `max_width` pixels wide, then threshold it.
    ///
    /// Nearest-neighbour scaling keeps QR module edges sharp.
    pub fn fit_width(image: &GrayImage, max_width: u32) -> Self {
        if image.width() <= max_width || max_width == 0 {
            return Self::from_gray(image);
        }
        let height = (image.height() as u64 * max_width as u64 / image.width() as u64).max(1) as u32;
        let scaled = imageops::resize(image, max_width, height, FilterType::Nearest);
        Self::from_gray(&scaled)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_row(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    /// Packed row data, `bytes_per_row() * height()` bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_black(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y as usize * self.bytes_per_row() + (x / 8) as usize;
        self.data[idx] & (0x80 >> (x % 8)) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn packs_bits_msb_first() {
        let mut img = GrayImage::from_pixel(10, 2, Luma([255]));
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(9, 1, Luma([10]));

        let bitmap = MonoBitmap::from_gray(&img);
        assert_eq!(bitmap.bytes_per_row(), 2);
        assert_eq!(bitmap.data(), &[0x80, 0x00, 0x00, 0x40]);
        assert!(bitmap.is_black(0, 0));
        assert!(bitmap.is_black(9, 1));
        assert!(!bitmap.is_black(1, 0));
    }

    #[test]
    fn threshold_splits_gray_levels() {
        let mut img = GrayImage::from_pixel(2, 1, Luma([127]));
        img.put_pixel(1, 0, Luma([128]));
        let bitmap = MonoBitmap::from_gray(&img);
        assert!(bitmap.is_black(0, 0));
        assert!(!bitmap.is_black(1, 0));
    }

    #[test]
    fn wide_images_are_scaled_down() {
        let img = GrayImage::from_pixel(800, 400, Luma([0]));
        let bitmap = MonoBitmap::fit_width(&img, THERMAL_DOTS_58MM);
        assert_eq!(bitmap.width(), 384);
        assert_eq!(bitmap.height(), 192);

        let small = GrayImage::from_pixel(100, 100, Luma([0]));
        assert_eq!(MonoBitmap::fit_width(&small, THERMAL_DOTS_58MM).width(), 100);
    }
}

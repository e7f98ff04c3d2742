//! Compiled-in binary stencils for the digits printed in the grid cells.
//!
//! Every digit is 7 pixels high. Each row string uses `1` for ink and `0` for paper.
use image::{GrayImage, Luma};

/// A small binary bitmap, one string per pixel row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stencil(pub &'static [&'static str]);

impl Stencil {
    pub fn width(&self) -> u32 {
        self.0.first().map_or(0, |row| row.len() as u32)
    }

    pub fn height(&self) -> u32 {
        self.0.len() as u32
    }

    /// Ink is 255, paper is 0.
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            match self.0[y as usize].as_bytes()[x as usize] {
                b'1' => Luma([255u8]),
                _ => Luma([0u8]),
            }
        })
    }
}

/// The digits 0 to 9, indexed by value.
pub const DIGITS: [Stencil; 10] = [
    Stencil(&["0110", "1001", "1001", "1001", "1001", "1001", "1110"]),
    Stencil(&["01", "11", "01", "01", "01", "01", "01"]),
    Stencil(&["0110", "1001", "0001", "0010", "0010", "0100", "1111"]),
    Stencil(&["0110", "1001", "0001", "0010", "0001", "1001", "0110"]),
    Stencil(&["0001", "0011", "0101", "1001", "1111", "0001", "0001"]),
    Stencil(&["0111", "0100", "1110", "1001", "0001", "1001", "0110"]),
    Stencil(&["0110", "1001", "1110", "1001", "1001", "1001", "0110"]),
    Stencil(&["1111", "0001", "0010", "0010", "0100", "0100", "0100"]),
    Stencil(&["0110", "1001", "1001", "0110", "1001", "1001", "0110"]),
    Stencil(&["0110", "1001", "1001", "1001", "0111", "1001", "0110"]),
];

/// The right stem of a "4" whose crossbar runs one pixel into the next glyph.
pub const BRIDGE: Stencil = Stencil(&["10", "10", "10", "10", "11", "10", "10"]);

/// Offset of the bridging pixel inside [BRIDGE].
pub const BRIDGE_PIXEL: (u32, u32) = (1, 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stencil_dimensions() {
        for (digit, stencil) in DIGITS.iter().enumerate() {
            assert_eq!(stencil.height(), 7, "digit {}", digit);
            assert!(stencil.0.iter().all(|row| row.len() as u32 == stencil.width()));
        }
        assert_eq!(DIGITS[1].width(), 2);
        assert_eq!(DIGITS[8].width(), 4);
    }

    #[test]
    fn test_stencils_are_distinct() {
        for i in 0..DIGITS.len() {
            for j in i + 1..DIGITS.len() {
                assert_ne!(DIGITS[i], DIGITS[j], "{} and {}", i, j);
            }
        }
    }

    #[test]
    fn test_to_image() {
        let img = BRIDGE.to_image();
        assert_eq!(img.dimensions(), (2, 7));
        let (x, y) = BRIDGE_PIXEL;
        assert_eq!(img.get_pixel(x, y)[0], 255);
        assert_eq!(img.get_pixel(1, 3)[0], 0);
        assert_eq!(img.get_pixel(0, 0)[0], 255);
    }
}

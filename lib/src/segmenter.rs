use crate::templates::{BRIDGE, BRIDGE_PIXEL};
use image::math::Rect;
use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use imageproc::template_matching::{match_template, MatchTemplateMethod};
use log::debug;

/// Glyphs must be taller than this to be a digit.
pub const GLYPH_MIN_HEIGHT: u32 = 6;
/// Glyphs must be wider than this to be a digit.
pub const GLYPH_MIN_WIDTH: u32 = 1;
/// Minimum normalized cross correlation for a bridge match.
pub const BRIDGE_THRESHOLD: f32 = 0.97;

/// A single connected blob of ink inside a cell, candidate for one printed digit.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Position of the glyph inside the cell crop
    pub bounds: Rect,
    /// Binary image of the glyph: 255 for its own ink, 0 elsewhere
    pub image: GrayImage,
}

/// Splits the ink of a cell into digit glyphs.
pub struct Segmenter {
    bridge: GrayImage,
}

impl Default for Segmenter {
    fn default() -> Self {
        Segmenter::new()
    }
}

impl Segmenter {
    pub fn new() -> Segmenter {
        Segmenter {
            bridge: BRIDGE.to_image(),
        }
    }

    /// Erase the pixel that joins a "4" to the following glyph. Returns the number of erased pixels.
    pub fn repair_bridges(&self, cell: &mut GrayImage) -> usize {
        let (bw, bh) = self.bridge.dimensions();
        if cell.width() < bw || cell.height() < bh {
            return 0;
        }
        let scores = match_template(
            cell,
            &self.bridge,
            MatchTemplateMethod::CrossCorrelationNormalized,
        );
        let (dx, dy) = BRIDGE_PIXEL;
        let mut erased = 0;
        for (x, y, score) in scores.enumerate_pixels() {
            if score[0] >= BRIDGE_THRESHOLD {
                debug!("bridge at ({}, {}) score {:.3}", x + dx, y + dy, score[0]);
                cell.put_pixel(x + dx, y + dy, Luma([0]));
                erased += 1;
            }
        }
        erased
    }

    /// Find the digit glyphs in a cell crop, where ink is the foreground.
    ///
    /// Glyphs are returned left to right, which is the order of significance of the digits.
    /// A cell without any glyph is an unnumbered cell.
    pub fn glyphs(&self, mut cell: GrayImage) -> Vec<Glyph> {
        self.repair_bridges(&mut cell);
        let labels = connected_components(&cell, Connectivity::Eight, Luma([0u8]));

        // bounding box (x0, y0, x1, y1) per label
        let mut boxes: Vec<Option<(u32, u32, u32, u32)>> = Vec::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0] as usize;
            if label == 0 {
                continue;
            }
            if boxes.len() <= label {
                boxes.resize(label + 1, None);
            }
            boxes[label] = Some(match boxes[label] {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }

        let mut glyphs: Vec<Glyph> = boxes
            .into_iter()
            .enumerate()
            .filter_map(|(label, b)| b.map(|b| (label as u32, b)))
            .filter_map(|(label, (x0, y0, x1, y1))| {
                let bounds = Rect {
                    x: x0,
                    y: y0,
                    width: x1 - x0 + 1,
                    height: y1 - y0 + 1,
                };
                if bounds.height <= GLYPH_MIN_HEIGHT || bounds.width <= GLYPH_MIN_WIDTH {
                    debug!("skip noise {:?}", bounds);
                    return None;
                }
                let image = GrayImage::from_fn(bounds.width, bounds.height, |x, y| {
                    if labels.get_pixel(x0 + x, y0 + y)[0] == label {
                        Luma([255])
                    } else {
                        Luma([0])
                    }
                });
                Some(Glyph { bounds, image })
            })
            .collect();
        glyphs.sort_by_key(|g| g.bounds.x);
        glyphs
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::templates::{Stencil, DIGITS};

    /// Stamp `stencil` as 255 ink into `img` with its top left corner at (x, y).
    pub(crate) fn stamp(img: &mut GrayImage, stencil: &Stencil, x: u32, y: u32, ink: Luma<u8>) {
        let glyph = stencil.to_image();
        for (gx, gy, p) in glyph.enumerate_pixels() {
            if p[0] > 0 {
                img.put_pixel(x + gx, y + gy, ink);
            }
        }
    }

    #[test]
    fn test_single_digit() {
        let mut cell = GrayImage::new(20, 20);
        stamp(&mut cell, &DIGITS[7], 2, 2, Luma([255]));
        let glyphs = Segmenter::new().glyphs(cell);
        assert_eq!(glyphs.len(), 1);
        assert_eq!(glyphs[0].bounds, Rect { x: 2, y: 2, width: 4, height: 7 });
        assert_eq!(glyphs[0].image, DIGITS[7].to_image());
    }

    #[test]
    fn test_left_to_right_and_noise() {
        let mut cell = GrayImage::new(20, 20);
        // stamp the second digit first, so label order differs from position order
        stamp(&mut cell, &DIGITS[2], 5, 2, Luma([255]));
        stamp(&mut cell, &DIGITS[1], 2, 2, Luma([255]));
        cell.put_pixel(15, 15, Luma([255]));
        let glyphs = Segmenter::new().glyphs(cell);
        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs[0].image, DIGITS[1].to_image());
        assert_eq!(glyphs[1].image, DIGITS[2].to_image());
    }

    #[test]
    fn test_bridge_repair() {
        let mut cell = GrayImage::new(20, 20);
        stamp(&mut cell, &DIGITS[4], 2, 2, Luma([255]));
        stamp(&mut cell, &DIGITS[0], 7, 2, Luma([255]));
        // the crossbar of the 4 touches the 0
        cell.put_pixel(6, 6, Luma([255]));

        let segmenter = Segmenter::new();
        let mut repaired = cell.clone();
        assert_eq!(segmenter.repair_bridges(&mut repaired), 1);
        assert_eq!(repaired.get_pixel(6, 6)[0], 0);

        let glyphs = segmenter.glyphs(cell);
        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs[0].image, DIGITS[4].to_image());
        assert_eq!(glyphs[1].image, DIGITS[0].to_image());
    }

    #[test]
    fn test_no_bridge_on_plain_four() {
        let mut cell = GrayImage::new(20, 20);
        stamp(&mut cell, &DIGITS[4], 2, 2, Luma([255]));
        stamp(&mut cell, &DIGITS[1], 7, 2, Luma([255]));
        let mut copy = cell.clone();
        assert_eq!(Segmenter::new().repair_bridges(&mut copy), 0);
        assert_eq!(copy, cell);
    }

    #[test]
    fn test_empty_cell() {
        let cell = GrayImage::new(20, 20);
        assert!(Segmenter::new().glyphs(cell).is_empty());
    }
}

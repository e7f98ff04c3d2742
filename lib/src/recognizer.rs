use crate::crossword::{ClueKey, Clues, Coord, Direction, Grid};
use crate::layout::Layout;
use crate::segmenter::{Glyph, Segmenter};
use crate::templates::DIGITS;
use crate::Error;
use image::{GenericImageView, GrayImage};
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};
use log::{debug, warn};

/// Holds the result of recognize_grid: the grid skeleton plus every cell number that was read.
#[derive(Debug, Clone)]
pub struct RecognizedGrid {
    /// Playable cells have their pixel center set, no symbols yet
    pub grid: Grid,
    /// Cell numbers and the cell they are printed in
    pub numbers: Vec<(u32, Coord)>,
}

/// Crossword grid recognizer
pub struct Recognizer {
    pub templates: Vec<(u8, GrayImage)>,
    segmenter: Segmenter,
}

impl Default for Recognizer {
    fn default() -> Self {
        Recognizer::new()
    }
}

impl Recognizer {
    pub fn new() -> Recognizer {
        let templates = DIGITS
            .iter()
            .enumerate()
            .map(|(digit, stencil)| (digit as u8, stencil.to_image()))
            .collect();
        Recognizer {
            templates,
            segmenter: Segmenter::new(),
        }
    }

    /// Recognize a crossword grid image.
    ///
    /// The recognition process consists of these phases:
    /// 1. Layout of the grid: find the grid size and the blank cells with their grid coordinates
    /// 2. Split the ink inside every cell into glyphs
    /// 3. Use template matching to read the digits, and join them into the cell number
    ///
    /// # Errors
    /// * A cell has no area
    pub fn recognize_grid(&self, gray: &GrayImage) -> Result<RecognizedGrid, Error> {
        let layout = Layout::new(gray).segment()?;
        let mut grid = Grid::new(layout.rows, layout.cols);
        let mut numbers = Vec::new();
        for cell in layout.cells.iter() {
            let coord = Coord::new(cell.position.0, cell.position.1);
            if grid.get(coord).is_none() {
                warn!("cell {:?} lies outside the {} x {} grid", coord, layout.rows, layout.cols);
                continue;
            }
            let (cx, cy) = cell.centroid;
            grid.open(coord, (cx as f32, cy as f32));

            let b = cell.bounds;
            let crop = layout.ink.view(b.x, b.y, b.width, b.height).to_image();
            let glyphs = self.segmenter.glyphs(crop);
            if glyphs.is_empty() {
                continue;
            }
            match self.cell_number(&glyphs) {
                Some(number) => {
                    debug!("cell {:?} has number {}", coord, number);
                    numbers.push((number, coord));
                }
                None => warn!("could not read the number in cell {:?}", coord),
            }
        }
        Ok(RecognizedGrid { grid, numbers })
    }

    /// Recognize a single digit glyph. Templates with other dimensions than the glyph are not considered.
    ///
    /// Returns None if no template has the size of the glyph.
    pub fn recognize_digit(&self, glyph: &GrayImage) -> Option<u8> {
        let method = MatchTemplateMethod::CrossCorrelationNormalized;
        let mut best: Option<(u8, f32)> = None;
        for (digit, template) in self.templates.iter() {
            if template.dimensions() != glyph.dimensions() {
                continue;
            }
            let score = find_extremes(&match_template(glyph, template, method)).max_value;
            // first one wins a tie
            if best.map_or(!score.is_nan(), |(_, s)| score > s) {
                best = Some((*digit, score));
            }
        }
        best.map(|(digit, _)| digit)
    }

    /// Join the digits of left-to-right glyphs into a number.
    pub fn cell_number(&self, glyphs: &[Glyph]) -> Option<u32> {
        glyphs.iter().try_fold(0u32, |value, glyph| {
            let digit = self.recognize_digit(&glyph.image)?;
            value.checked_mul(10)?.checked_add(digit as u32)
        })
    }
}

/// Set the first cell of every clue whose index is printed in the grid.
///
/// A number may start both a horizontal and a vertical answer. Numbers without a clue are ignored.
pub fn bind_numbers(clues: &mut Clues, numbers: &[(u32, Coord)]) {
    for &(number, coord) in numbers.iter() {
        let mut bound = false;
        for &direction in Direction::ALL.iter() {
            if let Some(clue) = clues.get_mut(&ClueKey::new(direction, number)) {
                clue.start = Some(coord);
                bound = true;
            }
        }
        if !bound {
            debug!("number {} at {:?} has no clue", number, coord);
        }
    }
}

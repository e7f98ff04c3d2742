use crate::crossword::Grid;
use crate::Error;
use image::{DynamicImage, ImageFormat, ImageOutputFormat, Rgba};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};
use std::fmt;
use std::io::Cursor;

/// Height of the drawn letters in pixels.
pub const FONT_SCALE: f32 = 16.0;

const FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSans.ttf");
const LETTER_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Draws the letters of a grid onto the puzzle image.
#[derive(Clone)]
pub struct Renderer {
    font: Font<'static>,
    scale: Scale,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    pub fn new() -> Result<Renderer, Error> {
        let font = Font::try_from_bytes(FONT_DATA).ok_or(Error::FontUnavailable)?;
        Ok(Renderer {
            font,
            scale: Scale::uniform(FONT_SCALE),
        })
    }

    /// Return a copy of `image` with every filled cell's letter centered on the cell.
    pub fn render(&self, image: &DynamicImage, grid: &Grid) -> DynamicImage {
        let mut canvas = image.clone();
        for cell in grid.iter().flatten() {
            if let (Some((cx, cy)), Some(symbol)) = (cell.center, cell.symbol) {
                let text = symbol.to_string();
                let (w, h) = text_size(self.scale, &self.font, &text);
                let x = cx.round() as i32 - w / 2;
                let y = cy.round() as i32 - h / 2;
                draw_text_mut(&mut canvas, LETTER_COLOR, x, y, self.scale, &self.font, &text);
            }
        }
        canvas
    }

    /// Encode an image in `format`.
    pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::from(format))?;
        Ok(bytes)
    }
}

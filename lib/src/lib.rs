//! A library that turns a printed crossword into a playable one
//!
//! The grid image is analyzed to find the grid size, the playable cells and the numbers printed in them.
//! The numbers bind the clues to their first cell. The resulting [Crossword] accepts answers and draws
//! the current state back onto the image.
//!
//! # Basic usage
//! ```no_run
//! # use crossword_ocr::{Crossword, Direction, Error, RawEntry, RawPuzzle};
//! let raw = RawPuzzle {
//!     image: std::fs::read("puzzle.png").expect("puzzle image"),
//!     questions: vec![RawEntry::new(Direction::Horizontal, "1", "Pet that purrs")],
//!     answers: vec![RawEntry::new(Direction::Horizontal, "1", "cat")],
//! };
//! let mut crossword = Crossword::from_raw(&raw)?;
//! crossword.set_answer(Direction::Horizontal, 1, "cat")?;
//! println!("{}", crossword.grid());
//! std::fs::write("state.png", crossword.cur_state()?).expect("write state");
//! # Ok::<(), Error>(())
//! ```
//! The grid is displayed as a string, where `#` is a blocked cell and `.` an empty cell:
//!
//! ```text
//! cat#
//! .#..
//! ```

mod crossword;
mod error;
mod layout;
mod recognizer;
mod render;
mod segmenter;
mod source;
mod templates;

pub use crossword::{letters_word, normalize, Cell, Clue, ClueKey, Clues, Coord, Crossword, Direction, Grid};
pub use error::{Error, ErrorClass};
pub use layout::{CellRegion, Layout};
pub use recognizer::{bind_numbers, RecognizedGrid, Recognizer};
pub use render::Renderer;
pub use segmenter::{Glyph, Segmenter};
pub use source::{
    assemble_clues, load_random, load_with_retry, PuzzleSource, RawEntry, RawPuzzle, RetryPolicy,
};
pub use templates::{Stencil, BRIDGE, DIGITS};

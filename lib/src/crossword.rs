use crate::error::Error;
use crate::recognizer::{bind_numbers, Recognizer};
use crate::render::Renderer;
use crate::source::{assemble_clues, PuzzleSource, RawPuzzle};
use image::{DynamicImage, ImageFormat};
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Length unit forms: singular, dual and plural.
pub const LETTER_FORMS: [&str; 3] = ["буква", "буквы", "букв"];

/// The axis along which an answer is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Horizontal,
    Vertical,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Horizontal, Direction::Vertical];

    /// The coordinate `n` cells further along this direction.
    fn advance(self, coord: Coord, n: usize) -> Coord {
        match self {
            Direction::Horizontal => Coord::new(coord.row, coord.col + n),
            Direction::Vertical => Coord::new(coord.row + n, coord.col),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Horizontal => write!(f, "H"),
            Direction::Vertical => write!(f, "V"),
        }
    }
}

/// Identifies a clue: direction plus printed number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClueKey {
    pub direction: Direction,
    pub index: u32,
}

impl ClueKey {
    pub fn new(direction: Direction, index: u32) -> ClueKey {
        ClueKey { direction, index }
    }
}

impl fmt::Display for ClueKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.direction, self.index)
    }
}

/// A grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub fn new(row: usize, col: usize) -> Coord {
        Coord { row, col }
    }
}

/// A single crossword question with its expected answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Clue {
    pub text: String,
    /// Normalized expected answer
    pub answer: Vec<char>,
    /// The first cell of the answer, once the cell number has been found in the grid
    pub start: Option<Coord>,
    /// Whether an answer of the right length was ever submitted
    pub attempted: bool,
}

impl Clue {
    pub fn new(text: &str, answer: &str) -> Clue {
        Clue {
            text: String::from(text),
            answer: normalize(answer),
            start: None,
            attempted: false,
        }
    }

    /// Bind the clue to its first cell.
    pub fn at(mut self, start: Coord) -> Clue {
        self.start = Some(start);
        self
    }

    pub fn len(&self) -> usize {
        self.answer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answer.is_empty()
    }
}

pub type Clues = HashMap<ClueKey, Clue>;

/// Lowercase, treat "ё" as "е".
pub fn normalize(answer: &str) -> Vec<char> {
    answer
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'ё' { 'е' } else { c })
        .collect()
}

/// Pick the length unit form for `n`.
pub fn letters_word(n: usize) -> &'static str {
    let (tens, ones) = ((n / 10) % 10, n % 10);
    match (tens, ones) {
        (t, 1) if t != 1 => LETTER_FORMS[0],
        (t, 2..=3) if t != 1 => LETTER_FORMS[1],
        _ => LETTER_FORMS[2],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cell {
    /// Pixel center in the puzzle image. `None` for a blocked cell.
    pub center: Option<(f32, f32)>,
    pub symbol: Option<char>,
}

impl Cell {
    pub fn is_playable(&self) -> bool {
        self.center.is_some()
    }
}

/// Dense grid of cells, indexed as `grid[row][col]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grid(pub Vec<Vec<Cell>>);

impl Deref for Grid {
    type Target = Vec<Vec<Cell>>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Grid {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let grid_string = self
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match (cell.center, cell.symbol) {
                        (None, _) => '#',
                        (Some(_), None) => '.',
                        (Some(_), Some(c)) => c,
                    })
                    .collect::<String>()
            })
            .collect::<Vec<String>>()
            .join("\n");
        write!(f, "{}", grid_string)
    }
}

impl Grid {
    /// A `rows` x `cols` grid of blocked cells.
    pub fn new(rows: usize, cols: usize) -> Grid {
        Grid(vec![vec![Cell::default(); cols]; rows])
    }

    pub fn rows(&self) -> usize {
        self.len()
    }

    pub fn cols(&self) -> usize {
        self.first().map_or(0, Vec::len)
    }

    pub fn get(&self, coord: Coord) -> Option<&Cell> {
        self.0.get(coord.row).and_then(|row| row.get(coord.col))
    }

    pub fn get_mut(&mut self, coord: Coord) -> Option<&mut Cell> {
        self.0.get_mut(coord.row).and_then(|row| row.get_mut(coord.col))
    }

    /// Make a cell playable with its pixel center.
    pub fn open(&mut self, coord: Coord, center: (f32, f32)) {
        if let Some(cell) = self.get_mut(coord) {
            cell.center = Some(center);
        }
    }

    fn write(&mut self, start: Coord, direction: Direction, letters: &[char]) {
        for (n, &letter) in letters.iter().enumerate() {
            if let Some(cell) = self.get_mut(direction.advance(start, n)) {
                cell.symbol = Some(letter);
            }
        }
    }

    fn matches(&self, start: Coord, direction: Direction, letters: &[char]) -> bool {
        letters.iter().enumerate().all(|(n, &letter)| {
            self.get(direction.advance(start, n))
                .map_or(false, |cell| cell.symbol == Some(letter))
        })
    }
}

/// A playable crossword: the grid, the clues and the image they were read from.
#[derive(Debug)]
pub struct Crossword {
    image: DynamicImage,
    format: ImageFormat,
    grid: Grid,
    clues: Clues,
    renderer: Renderer,
}

impl Crossword {
    /// Create a crossword from a grid and clues that are already bound to their first cell.
    ///
    /// # Errors
    /// * A clue is not bound to a cell
    /// * An answer runs off the grid or over a blocked cell
    pub fn new(image: DynamicImage, grid: Grid, clues: Clues) -> Result<Crossword, Error> {
        for (&key, clue) in clues.iter() {
            let start = clue.start.ok_or(Error::UnboundClue(key))?;
            let fits = (0..clue.len()).all(|n| {
                grid.get(key.direction.advance(start, n))
                    .map_or(false, Cell::is_playable)
            });
            if !fits {
                return Err(Error::SpanOutOfGrid(key));
            }
        }
        Ok(Crossword {
            image,
            format: ImageFormat::Png,
            grid,
            clues,
            renderer: Renderer::new()?,
        })
    }

    /// Build a crossword from the raw puzzle data:
    /// 1. join questions and answers into clues
    /// 2. decode the image and recognize the grid layout and cell numbers
    /// 3. bind the clues to the numbered cells and validate the result
    ///
    /// # Errors
    /// * The image can not be decoded
    /// * Questions and answers do not match
    /// * A clue can not be bound to a cell, or its answer does not fit the grid
    pub fn from_raw(raw: &RawPuzzle) -> Result<Crossword, Error> {
        let mut clues = assemble_clues(&raw.questions, &raw.answers)?;
        let format = image::guess_format(&raw.image).ok();
        let image = image::load_from_memory(&raw.image).map_err(Error::Decode)?;
        let recognized = Recognizer::new().recognize_grid(&image.to_luma8())?;
        bind_numbers(&mut clues, &recognized.numbers);
        let mut crossword = Crossword::new(image, recognized.grid, clues)?;
        if let Some(format) = format {
            crossword.format = format;
        }
        info!(
            "crossword ready: {} x {} with {} clues",
            crossword.grid.rows(),
            crossword.grid.cols(),
            crossword.clues.len()
        );
        Ok(crossword)
    }

    /// Fetch puzzle `id` from `source` and build it.
    pub fn from_source<S: PuzzleSource + ?Sized>(source: &S, id: u32) -> Result<Crossword, Error> {
        let raw = source.fetch(id)?;
        Crossword::from_raw(&raw)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn clues(&self) -> &Clues {
        &self.clues
    }

    pub fn clue(&self, direction: Direction, index: u32) -> Option<&Clue> {
        self.clues.get(&ClueKey::new(direction, index))
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Submit an answer. On success the clue is marked attempted and the letters are written into the grid.
    ///
    /// # Errors
    /// The clue does not exist or is not bound to a cell, or the answer is too short or too long.
    /// The puzzle is left unchanged.
    pub fn set_answer(&mut self, direction: Direction, index: u32, answer: &str) -> Result<(), Error> {
        let key = ClueKey::new(direction, index);
        let clue = self.clues.get_mut(&key).ok_or(Error::UnknownClue(key))?;
        let letters = normalize(answer);
        let (expected, actual) = (clue.len(), letters.len());
        if actual < expected {
            return Err(Error::AnswerTooShort {
                key,
                expected,
                actual,
            });
        }
        if actual > expected {
            return Err(Error::AnswerTooLong {
                key,
                expected,
                actual,
            });
        }
        let start = clue.start.ok_or(Error::UnboundClue(key))?;
        clue.attempted = true;
        self.grid.write(start, direction, &letters);
        debug!("{} set to {}", key, answer);
        Ok(())
    }

    /// Clues nobody answered yet, as `(vertical, horizontal)` lists.
    pub fn list_unattempted_questions(&self) -> (String, String) {
        self.list_questions(|_, clue| !clue.attempted)
    }

    /// Clues whose letters in the grid differ from the answer, as `(vertical, horizontal)` lists.
    pub fn list_unsolved_questions(&self) -> (String, String) {
        self.list_questions(|key, clue| !self.is_clue_solved(key, clue))
    }

    fn list_questions<F>(&self, keep: F) -> (String, String)
    where
        F: Fn(&ClueKey, &Clue) -> bool,
    {
        let list = |direction: Direction| {
            let mut selected: Vec<_> = self
                .clues
                .iter()
                .filter(|&(key, clue)| key.direction == direction && keep(key, clue))
                .collect();
            selected.sort_by_key(|(key, _)| key.index);
            selected
                .iter()
                .map(|(key, clue)| {
                    format!(
                        "{}. {} ({} {})",
                        key.index,
                        clue.text,
                        clue.len(),
                        letters_word(clue.len())
                    )
                })
                .collect::<Vec<String>>()
                .join("\n")
        };
        (list(Direction::Vertical), list(Direction::Horizontal))
    }

    /// Reveal every answer.
    pub fn complete_crossword(&mut self) {
        for (key, clue) in self.clues.iter() {
            if let Some(start) = clue.start {
                self.grid.write(start, key.direction, &clue.answer);
            }
        }
    }

    /// True once every clue was attempted.
    pub fn is_filled(&self) -> bool {
        self.clues.values().all(|clue| clue.attempted)
    }

    /// True when the grid holds every expected answer.
    pub fn is_solved(&self) -> bool {
        self.clues
            .iter()
            .all(|(key, clue)| self.is_clue_solved(key, clue))
    }

    fn is_clue_solved(&self, key: &ClueKey, clue: &Clue) -> bool {
        clue.start
            .map_or(false, |start| self.grid.matches(start, key.direction, &clue.answer))
    }

    /// The puzzle image with the current letters drawn in.
    pub fn render(&self) -> DynamicImage {
        self.renderer.render(&self.image, &self.grid)
    }

    /// The rendered puzzle, encoded in the format of the source image.
    pub fn cur_state(&self) -> Result<Vec<u8>, Error> {
        Renderer::encode(&self.render(), self.format)
    }
}

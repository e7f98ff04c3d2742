use crate::crossword::ClueKey;
use thiserror::Error;

/// Broad failure classes. Used by the retry policy to decide whether another puzzle is worth a try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The puzzle data could not be fetched or decoded
    Retrieval,
    /// The puzzle data was fetched but does not describe a usable crossword
    Parse,
    /// A submitted answer was rejected; the puzzle is unchanged
    Answer,
    /// Anything else, including programmer errors
    Internal,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Puzzle could not be retrieved: {0}")]
    Retrieval(String),
    /// Error decoding the puzzle image
    #[error("Puzzle image could not be decoded")]
    Decode(#[source] image::ImageError),
    #[error("Question {0} has no answer")]
    MissingAnswer(ClueKey),
    #[error("Answer {0} has no question")]
    MissingQuestion(ClueKey),
    #[error("Clue {0} is listed twice")]
    DuplicateClue(ClueKey),
    #[error("Invalid clue index {0:?}")]
    InvalidIndex(String),
    #[error("No numbered cell found for clue {0}")]
    UnboundClue(ClueKey),
    #[error("Answer for clue {0} does not fit the grid")]
    SpanOutOfGrid(ClueKey),
    #[error("Grid contains a cell contour without area")]
    DegenerateContour,
    #[error("There is no clue {0}")]
    UnknownClue(ClueKey),
    #[error("Answer for {key} is too short: expected {expected} letters, got {actual}")]
    AnswerTooShort {
        key: ClueKey,
        expected: usize,
        actual: usize,
    },
    #[error("Answer for {key} is too long: expected {expected} letters, got {actual}")]
    AnswerTooLong {
        key: ClueKey,
        expected: usize,
        actual: usize,
    },
    /// Error encoding the rendered image
    #[error("Image could not be encoded")]
    Image(#[from] image::ImageError),
    #[error("Embedded font could not be loaded")]
    FontUnavailable,
    #[error("Gave up after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<Error>,
    },
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        use Error::*;
        match self {
            Retrieval(_) | Decode(_) => ErrorClass::Retrieval,
            MissingAnswer(_) | MissingQuestion(_) | DuplicateClue(_) | InvalidIndex(_)
            | UnboundClue(_) | SpanOutOfGrid(_) | DegenerateContour => ErrorClass::Parse,
            UnknownClue(_) | AnswerTooShort { .. } | AnswerTooLong { .. } => ErrorClass::Answer,
            Image(_) | FontUnavailable | RetriesExhausted { .. } => ErrorClass::Internal,
        }
    }

    /// Whether constructing a different puzzle may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Retrieval | ErrorClass::Parse)
    }
}

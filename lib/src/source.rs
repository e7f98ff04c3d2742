//! Boundary to the collaborator that fetches puzzles, and the retry policy around construction.
use crate::crossword::{Clue, ClueKey, Clues, Crossword, Direction};
use crate::Error;
use log::{info, warn};
use rand::Rng;
use std::collections::HashMap;
use std::env;

/// Default number of puzzles to try before giving up.
pub const MAX_ATTEMPTS: u32 = 3;
/// Puzzle ids are drawn from `1..=MAX_PUZZLE_ID`.
pub const MAX_PUZZLE_ID: u32 = 5000;

/// One question or answer line as delivered by the source. `index` is still the printed text.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub direction: Direction,
    pub index: String,
    pub text: String,
}

impl RawEntry {
    pub fn new(direction: Direction, index: &str, text: &str) -> RawEntry {
        RawEntry {
            direction,
            index: String::from(index),
            text: String::from(text),
        }
    }
}

/// Everything needed to build one crossword.
#[derive(Debug, Clone, Default)]
pub struct RawPuzzle {
    /// Encoded puzzle image
    pub image: Vec<u8>,
    pub questions: Vec<RawEntry>,
    pub answers: Vec<RawEntry>,
}

/// Fetches raw puzzles by id.
pub trait PuzzleSource {
    /// # Errors
    /// [Error::Retrieval] when the puzzle can not be fetched.
    fn fetch(&self, id: u32) -> Result<RawPuzzle, Error>;
}

fn parse_key(entry: &RawEntry) -> Result<ClueKey, Error> {
    let index = entry.index.trim();
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidIndex(entry.index.clone()));
    }
    match index.parse::<u32>() {
        Ok(n) if n > 0 => Ok(ClueKey::new(entry.direction, n)),
        _ => Err(Error::InvalidIndex(entry.index.clone())),
    }
}

/// Join questions and answers by direction and index. Answers are normalized.
///
/// # Errors
/// An index that is not a positive decimal number, a key listed twice,
/// or a key present in only one of the lists.
pub fn assemble_clues(questions: &[RawEntry], answers: &[RawEntry]) -> Result<Clues, Error> {
    let mut texts = HashMap::new();
    for question in questions.iter() {
        let key = parse_key(question)?;
        if texts.insert(key, question.text.as_str()).is_some() {
            return Err(Error::DuplicateClue(key));
        }
    }
    let mut clues = Clues::new();
    for answer in answers.iter() {
        let key = parse_key(answer)?;
        if clues.contains_key(&key) {
            return Err(Error::DuplicateClue(key));
        }
        let text = texts.remove(&key).ok_or(Error::MissingQuestion(key))?;
        clues.insert(key, Clue::new(text, &answer.text));
    }
    if let Some(&key) = texts.keys().min() {
        return Err(Error::MissingAnswer(key));
    }
    Ok(clues)
}

/// How often and from which range puzzles are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub max_puzzle_id: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: MAX_ATTEMPTS,
            max_puzzle_id: MAX_PUZZLE_ID,
        }
    }
}

impl RetryPolicy {
    /// Read `CROSSWORD_MAX_ATTEMPTS` and `CROSSWORD_MAX_ID`, with the defaults for missing or invalid values.
    pub fn from_env() -> RetryPolicy {
        let var = |name: &str, default: u32| {
            env::var(name)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };
        RetryPolicy {
            max_attempts: var("CROSSWORD_MAX_ATTEMPTS", MAX_ATTEMPTS),
            max_puzzle_id: var("CROSSWORD_MAX_ID", MAX_PUZZLE_ID),
        }
    }
}

/// Build the first usable crossword from `ids`.
///
/// Retrieval and parse failures move on to the next id, at most `policy.max_attempts` times.
/// Any other error is returned at once.
pub fn load_with_retry<S, I>(source: &S, ids: I, policy: &RetryPolicy) -> Result<Crossword, Error>
where
    S: PuzzleSource + ?Sized,
    I: IntoIterator<Item = u32>,
{
    let mut attempts = 0;
    let mut last = None;
    for id in ids.into_iter().take(policy.max_attempts as usize) {
        attempts += 1;
        match Crossword::from_source(source, id) {
            Ok(crossword) => {
                info!("loaded puzzle {} after {} attempts", id, attempts);
                return Ok(crossword);
            }
            Err(err) if err.is_retryable() => {
                warn!("puzzle {} is unusable: {}", id, err);
                last = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    let last = last.unwrap_or_else(|| Error::Retrieval(String::from("no puzzle ids to try")));
    Err(Error::RetriesExhausted {
        attempts,
        last: Box::new(last),
    })
}

/// Build a crossword from randomly chosen puzzle ids.
pub fn load_random<S>(source: &S, policy: &RetryPolicy) -> Result<Crossword, Error>
where
    S: PuzzleSource + ?Sized,
{
    let mut rng = rand::thread_rng();
    let max_id = policy.max_puzzle_id.max(1);
    let ids = std::iter::repeat_with(move || rng.gen_range(1..=max_id));
    load_with_retry(source, ids, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::*;

    fn entries(list: &[(Direction, &str, &str)]) -> Vec<RawEntry> {
        list.iter()
            .map(|&(direction, index, text)| RawEntry::new(direction, index, text))
            .collect()
    }

    #[test]
    fn test_assemble_clues() {
        let questions = entries(&[(Horizontal, "1", "Кошачий звук"), (Vertical, "1", "Ёлка")]);
        let answers = entries(&[(Vertical, "1", "Ёль"), (Horizontal, "1", "Мяу")]);
        let clues = assemble_clues(&questions, &answers).unwrap();
        assert_eq!(clues.len(), 2);
        let h1 = &clues[&ClueKey::new(Horizontal, 1)];
        assert_eq!(h1.text, "Кошачий звук");
        assert_eq!(h1.answer, vec!['м', 'я', 'у']);
        assert_eq!(clues[&ClueKey::new(Vertical, 1)].answer, vec!['е', 'л', 'ь']);
        assert!(h1.start.is_none() && !h1.attempted);
    }

    #[test]
    fn test_assemble_mismatch() {
        let questions = entries(&[(Horizontal, "1", "q1"), (Horizontal, "2", "q2")]);
        let answers = entries(&[(Horizontal, "1", "a1")]);
        assert!(matches!(
            assemble_clues(&questions, &answers),
            Err(Error::MissingAnswer(ClueKey { index: 2, .. }))
        ));

        let answers = entries(&[(Horizontal, "1", "a1"), (Horizontal, "2", "a2"), (Vertical, "2", "a3")]);
        assert!(matches!(
            assemble_clues(&questions, &answers),
            Err(Error::MissingQuestion(ClueKey { direction: Vertical, index: 2 }))
        ));
    }

    #[test]
    fn test_assemble_bad_index() {
        for &index in &["", "x1", "+3", "0", "99999999999"] {
            let questions = entries(&[(Horizontal, index, "q")]);
            assert!(
                matches!(assemble_clues(&questions, &[]), Err(Error::InvalidIndex(_))),
                "index {:?}",
                index
            );
        }
        let questions = entries(&[(Horizontal, "4", "q"), (Horizontal, " 4", "again")]);
        assert!(matches!(
            assemble_clues(&questions, &[]),
            Err(Error::DuplicateClue(_))
        ));
    }

    struct Failing(fn(u32) -> Error);

    impl PuzzleSource for Failing {
        fn fetch(&self, id: u32) -> Result<RawPuzzle, Error> {
            Err((self.0)(id))
        }
    }

    #[test]
    fn test_retry_gives_up() {
        let source = Failing(|id| Error::Retrieval(format!("HTTP 404 for {}", id)));
        let policy = RetryPolicy {
            max_attempts: 2,
            max_puzzle_id: 10,
        };
        match load_random(&source, &policy) {
            Err(Error::RetriesExhausted { attempts: 2, last }) => {
                assert!(matches!(*last, Error::Retrieval(_)))
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_retry_stops_on_internal_error() {
        let source = Failing(|_| Error::FontUnavailable);
        let result = load_with_retry(&source, vec![1, 2, 3], &RetryPolicy::default());
        assert!(matches!(result, Err(Error::FontUnavailable)));
    }

    #[test]
    fn test_retry_without_ids() {
        let source = Failing(|_| Error::FontUnavailable);
        let result = load_with_retry(&source, Vec::new(), &RetryPolicy::default());
        assert!(matches!(
            result,
            Err(Error::RetriesExhausted { attempts: 0, .. })
        ));
    }

    #[test]
    fn test_policy_from_env() {
        env::set_var("CROSSWORD_MAX_ATTEMPTS", " 7 ");
        env::set_var("CROSSWORD_MAX_ID", "lots");
        let policy = RetryPolicy::from_env();
        env::remove_var("CROSSWORD_MAX_ATTEMPTS");
        env::remove_var("CROSSWORD_MAX_ID");
        assert_eq!(policy.max_attempts, 7);
        assert_eq!(policy.max_puzzle_id, MAX_PUZZLE_ID);
    }

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.max_puzzle_id, 5000);
    }
}

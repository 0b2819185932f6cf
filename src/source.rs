//! Candidate loading from a newline-separated word file.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::config::{MAX_PLATE_LENGTH, MIN_PLATE_LENGTH};

/// Errors that can occur while loading candidates.
#[derive(Debug)]
#[non_exhaustive]
pub enum SourceError {
    /// The input file does not exist.
    NotFound(String),
    /// The input file could not be read.
    Io(io::Error),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "input file not found: {path}"),
            Self::Io(e) => write!(f, "failed to read input file: {e}"),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Io(e) => Some(e),
        }
    }
}

/// Load candidate plates from a newline-separated word file.
///
/// Words are trimmed and lowercased, kept only when their length falls
/// within the service's accepted range, deduplicated preserving first
/// occurrence, and sorted by descending length then lexicographically.
///
/// # Errors
///
/// Returns [`SourceError`] when the file is missing or unreadable.
pub fn load_plates(path: &Path) -> Result<Vec<String>, SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.display().to_string()));
    }
    let contents = fs::read_to_string(path).map_err(SourceError::Io)?;
    Ok(filter_candidates(contents.lines()))
}

/// Normalize, filter, dedup, and sort raw candidate lines.
pub fn filter_candidates<'a, I>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut plates: Vec<String> = lines
        .into_iter()
        .map(|line| line.trim().to_lowercase())
        .filter(|word| {
            let length = word.chars().count();
            (MIN_PLATE_LENGTH..=MAX_PLATE_LENGTH).contains(&length)
        })
        .collect();

    // duplicates would trip the pool's disjoint-merge invariant
    let mut seen = std::collections::HashSet::new();
    plates.retain(|plate| seen.insert(plate.clone()));

    plates.sort_by(|a, b| {
        let (la, lb) = (a.chars().count(), b.chars().count());
        lb.cmp(&la).then_with(|| a.cmp(b))
    });
    plates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_length_and_lowercases() {
        let plates = filter_candidates(vec!["CATDOG", "a", "toolongword", "Hi"]);
        assert_eq!(plates, vec!["catdog", "hi"]);
    }

    #[test]
    fn sorts_by_descending_length_then_lexicographically() {
        let plates = filter_candidates(vec!["bb", "aa", "zzz", "yyy"]);
        assert_eq!(plates, vec!["yyy", "zzz", "aa", "bb"]);
    }

    #[test]
    fn deduplicates_preserving_first_occurrence() {
        let plates = filter_candidates(vec!["cat", "CAT", "dog", "cat"]);
        assert_eq!(plates, vec!["cat", "dog"]);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let plates = filter_candidates(vec!["  cat  ", "\tdog"]);
        assert_eq!(plates, vec!["cat", "dog"]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = Path::new("/definitely/not/a/real/wordlist.txt");
        match load_plates(path) {
            Err(SourceError::NotFound(p)) => assert!(p.contains("wordlist")),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}

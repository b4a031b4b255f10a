//! Line filtering with a compiled regular expression.

use crate::error::{Error, Result};
use regex::Regex;

/// A half-open byte range `[start, end)` of a match within one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A pattern compiled once per run.
///
/// Without a pattern every line matches and nothing is highlighted.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    regex: Option<Regex>,
}

impl Filter {
    /// Compiles `pattern`; `None` or an empty pattern yields the identity filter.
    ///
    /// The dialect has no backreferences or lookaround; `(?i)` turns on
    /// case-insensitive matching.
    pub fn new(pattern: Option<&str>) -> Result<Self> {
        let regex = match pattern {
            Some(pattern) if !pattern.is_empty() => {
                Some(Regex::new(pattern).map_err(|source| Error::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?)
            }
            _ => None,
        };
        Ok(Self { regex })
    }

    /// A filter that accepts every line.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Whether a pattern is in effect.
    pub fn is_active(&self) -> bool {
        self.regex.is_some()
    }

    pub fn pattern(&self) -> Option<&str> {
        self.regex.as_ref().map(Regex::as_str)
    }

    pub fn matches(&self, line: &str) -> bool {
        self.regex.as_ref().is_none_or(|regex| regex.is_match(line))
    }

    /// All non-empty matches, left to right and non-overlapping.
    pub fn find_all(&self, line: &str) -> Vec<MatchSpan> {
        match &self.regex {
            Some(regex) => regex
                .find_iter(line)
                .filter(|m| !m.is_empty())
                .map(|m| MatchSpan::new(m.start(), m.end()))
                .collect(),
            None => Vec::new(),
        }
    }
}

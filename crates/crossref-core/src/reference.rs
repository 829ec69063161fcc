//! Canonical references
//!
//! A `Ref` points at a location inside one text: a whole book, a section,
//! or a contiguous span of sections. Stored links carry refs in canonical
//! string form (`"Genesis 1:1-5"`); this module formats that form and parses
//! it back without consulting the catalog, which is what lets link queries
//! ask "does this stored string sit at or under that ref?" directly.
//!
//! Resolving user input against the catalog lives in [`crate::library`].

use std::cmp::Ordering;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Canonical ref syntax: title, then optionally one space and `a:b[-c:d]`
static CANONICAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<title>.+?)(?: (?P<sections>\d+(?::\d+)*(?:-\d+(?::\d+)*)?))?$")
        .expect("canonical ref pattern is valid")
});

/// A resolved location within one text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ref {
    book: String,
    start: Vec<u32>,
    end: Vec<u32>,
}

impl Ref {
    /// Build a ref from already validated parts.
    ///
    /// `start` and `end` must have equal length with `start <= end`.
    pub(crate) fn from_parts(book: String, start: Vec<u32>, end: Vec<u32>) -> Self {
        debug_assert_eq!(start.len(), end.len());
        Self { book, start, end }
    }

    /// A ref to a whole book
    pub fn whole(book: impl Into<String>) -> Self {
        Self {
            book: book.into(),
            start: Vec::new(),
            end: Vec::new(),
        }
    }

    /// Parse a stored canonical string such as `"Rashi on Genesis 1:1-3"`.
    ///
    /// Purely syntactic: the title is not checked against any catalog.
    /// Returns `None` for strings that are not in canonical form.
    pub fn parse_canonical(s: &str) -> Option<Self> {
        let caps = CANONICAL_RE.captures(s)?;
        let book = caps.name("title")?.as_str().to_string();
        let (start, end) = match caps.name("sections") {
            Some(m) => parse_span(m.as_str(), |c| c == ':')?,
            None => (Vec::new(), Vec::new()),
        };
        Some(Self { book, start, end })
    }

    /// The canonical title of the text this ref points into
    pub fn book(&self) -> &str {
        &self.book
    }

    pub fn start(&self) -> &[u32] {
        &self.start
    }

    pub fn end(&self) -> &[u32] {
        &self.end
    }

    /// Whether this ref addresses the whole book
    pub fn is_whole_book(&self) -> bool {
        self.start.is_empty()
    }

    /// The canonical string form
    pub fn normal(&self) -> String {
        self.to_string()
    }

    /// Whether `other` denotes this location or one nested inside it
    pub fn contains(&self, other: &Ref) -> bool {
        if self.book != other.book {
            return false;
        }
        let depth = self.start.len();
        if other.start.len() < depth {
            return false;
        }
        other.start[..depth].cmp(&self.start[..]) != Ordering::Less
            && other.end[..depth].cmp(&self.end[..]) != Ordering::Greater
    }

    /// Whether the canonical string `candidate` matches this ref or nests under it
    pub fn matches_or_nests(&self, candidate: &str) -> bool {
        Ref::parse_canonical(candidate).is_some_and(|r| self.contains(&r))
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.book)?;
        if self.start.is_empty() {
            return Ok(());
        }
        write!(f, " {}", join(&self.start))?;
        if let Some(first_diff) = self.start.iter().zip(&self.end).position(|(a, b)| a != b) {
            write!(f, "-{}", join(&self.end[first_diff..]))?;
        }
        Ok(())
    }
}

fn join(sections: &[u32]) -> String {
    sections
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(":")
}

/// Parse `"1:2-3"`-style section text into equal-length start/end paths.
///
/// An abbreviated end ("1:2-5") inherits the leading sections of the start.
/// Returns `None` on zero sections, malformed numbers, an end deeper than the
/// start, or an end before the start.
pub(crate) fn parse_span<P>(text: &str, separators: P) -> Option<(Vec<u32>, Vec<u32>)>
where
    P: Fn(char) -> bool + Copy,
{
    let mut halves = text.splitn(2, '-');
    let start = parse_path(halves.next()?, separators)?;
    let end = match halves.next() {
        Some(tail) => {
            let tail = parse_path(tail, separators)?;
            if tail.len() > start.len() {
                return None;
            }
            let mut end = start[..start.len() - tail.len()].to_vec();
            end.extend(tail);
            end
        }
        None => start.clone(),
    };
    if end < start {
        return None;
    }
    Some((start, end))
}

fn parse_path(text: &str, separators: impl Fn(char) -> bool) -> Option<Vec<u32>> {
    text.split(separators)
        .map(|s| s.parse::<u32>().ok().filter(|n| *n > 0))
        .collect()
}

//! Reference resolution against the text catalog
//!
//! The `Library` holds every `IndexEntry` in memory and turns raw citation
//! strings into canonical [`Ref`]s:
//!
//! - `"genesis 1.1"`, `"Genesis_1:1"` and `"Genesis  1:1"` all resolve to `Genesis 1:1`
//! - `"Rashi on Genesis 1:1:2"` composes the commentator `Rashi` with the base
//!   text `Genesis`, one level deeper than the base
//!
//! It also answers the category questions link queries need (titles in a
//! category, known commentators, the primary category of a ref).

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{RegistryError, RegistryResult};
use crate::models::IndexEntry;
use crate::reference::{parse_span, Ref};

/// Raw citation syntax: title, then optionally a space or dot and `a:b[-c:d]`
/// with `:` or `.` between sections
static RAW_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<title>.+?)(?:[ .](?P<sections>\d+(?:[.:]\d+)*(?:-\d+(?:[.:]\d+)*)?))?$")
        .expect("raw ref pattern is valid")
});

/// The separator between commentator and base text in composed titles
const COMMENTARY_JOINER: &str = " on ";

/// A title resolved against the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedTitle {
    title: String,
    depth: usize,
    categories: Vec<String>,
}

/// In-memory catalog of indexes
#[derive(Debug, Clone, Default)]
pub struct Library {
    entries: Vec<IndexEntry>,
    by_title: HashMap<String, usize>,
}

impl Library {
    pub fn new(entries: impl IntoIterator<Item = IndexEntry>) -> Self {
        let mut library = Self::default();
        for entry in entries {
            library.insert(entry);
        }
        library
    }

    /// Insert or replace an index, keyed by case-insensitive title.
    /// A replaced index keeps its stored title.
    pub fn insert(&mut self, entry: IndexEntry) {
        let key = entry.title.to_lowercase();
        match self.by_title.get(&key) {
            Some(&i) => {
                let title = std::mem::take(&mut self.entries[i].title);
                self.entries[i] = IndexEntry { title, ..entry };
            }
            None => {
                self.by_title.insert(key, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Remove an index, returning it if it existed
    pub fn remove(&mut self, title: &str) -> Option<IndexEntry> {
        let i = self.by_title.remove(&title.to_lowercase())?;
        let removed = self.entries.remove(i);
        for slot in self.by_title.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Rename an index in place, returning the updated entry
    pub fn rename(&mut self, old: &str, new: &str) -> Option<&IndexEntry> {
        let i = self.by_title.remove(&old.to_lowercase())?;
        self.entries[i].title = new.to_string();
        self.by_title.insert(new.to_lowercase(), i);
        Some(&self.entries[i])
    }

    pub fn get(&self, title: &str) -> Option<&IndexEntry> {
        self.by_title
            .get(&title.to_lowercase())
            .map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // ==================== Resolution ====================

    /// Resolve a raw citation to a canonical ref
    pub fn resolve(&self, raw: &str) -> RegistryResult<Ref> {
        let cleaned = clean(raw);
        if cleaned.is_empty() {
            return Err(RegistryError::invalid_reference(raw, "empty reference"));
        }

        let caps = RAW_REF_RE
            .captures(&cleaned)
            .ok_or_else(|| RegistryError::invalid_reference(raw, "unrecognized syntax"))?;
        let title_text = caps.name("title").map_or("", |m| m.as_str());
        let resolved = self.resolve_title(title_text).ok_or_else(|| {
            RegistryError::invalid_reference(raw, format!("unknown title '{}'", title_text))
        })?;

        let (start, end) = match caps.name("sections") {
            Some(m) => parse_span(m.as_str(), |c| c == ':' || c == '.').ok_or_else(|| {
                RegistryError::invalid_reference(raw, "sections must be positive and in order")
            })?,
            None => (Vec::new(), Vec::new()),
        };

        if start.len() > resolved.depth {
            return Err(RegistryError::invalid_reference(
                raw,
                format!(
                    "'{}' has {} section level(s), got {}",
                    resolved.title,
                    resolved.depth,
                    start.len()
                ),
            ));
        }

        Ok(Ref::from_parts(resolved.title, start, end))
    }

    /// Resolve a raw citation straight to its canonical string
    pub fn normalize(&self, raw: &str) -> RegistryResult<String> {
        self.resolve(raw).map(|r| r.normal())
    }

    /// First category of the index a ref points into
    pub fn primary_category(&self, r: &Ref) -> Option<String> {
        self.resolve_title(r.book())
            .and_then(|t| t.categories.into_iter().next())
    }

    fn resolve_title(&self, title: &str) -> Option<ResolvedTitle> {
        if let Some(entry) = self.get(title) {
            return Some(ResolvedTitle {
                title: entry.title.clone(),
                depth: entry.depth(),
                categories: entry.categories.clone(),
            });
        }

        // "<Commentator> on <Base>"
        let split = title.to_ascii_lowercase().find(COMMENTARY_JOINER)?;
        let commentator = self.get(&title[..split]).filter(|e| e.is_commentary())?;
        let base = self
            .get(&title[split + COMMENTARY_JOINER.len()..])
            .filter(|e| !e.is_commentary())?;
        Some(ResolvedTitle {
            title: format!("{}{}{}", commentator.title, COMMENTARY_JOINER, base.title),
            depth: base.depth() + 1,
            categories: commentator.categories.clone(),
        })
    }

    // ==================== Catalog queries ====================

    /// Every category name used by any index
    pub fn categories(&self) -> BTreeSet<&str> {
        self.entries
            .iter()
            .flat_map(|e| e.categories.iter().map(String::as_str))
            .collect()
    }

    pub fn is_category(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.in_category(name))
    }

    /// Titles of indexes in a category, in catalog order
    pub fn titles_in_category(&self, category: &str, include_commentary: bool) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.in_category(category))
            .filter(|e| include_commentary || !e.is_commentary())
            .map(|e| e.title.clone())
            .collect()
    }

    /// Titles in a category that carry none of the `excluded` categories
    pub fn titles_for_explorer(&self, category: &str, excluded: &[String]) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.in_category(category))
            .filter(|e| !excluded.iter().any(|x| e.in_category(x)))
            .map(|e| e.title.clone())
            .collect()
    }

    /// Titles of every commentator index
    pub fn commentators(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.is_commentary())
            .map(|e| e.title.clone())
            .collect()
    }
}

/// Map URL-style underscores to spaces and collapse whitespace
fn clean(raw: &str) -> String {
    raw.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

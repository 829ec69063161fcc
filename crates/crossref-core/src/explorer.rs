//! Link Explorer queries
//!
//! Book-to-book link counts between two categories, and the individual links
//! between one book and a category, shaped for presentation (titles
//! hyphenated, refs split into title and location).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::models::{BookCategoryLink, BookPairCount, RefParts};
use crate::registry::LinkRegistry;
use crate::storage::links;

/// Title, then a location starting at the first digit after a space
static REF_PARTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<title>.+?) (?P<loc>\d.*)$").expect("ref parts pattern is valid"));

/// Cached link counts keyed by the `(cat1, cat2)` pair.
///
/// Owned by the registry and cleared whenever links or indexes change.
#[derive(Debug, Default)]
pub struct LinkCountCache {
    entries: RwLock<HashMap<(String, String), Arc<Vec<BookPairCount>>>>,
}

impl LinkCountCache {
    pub fn get(&self, cat1: &str, cat2: &str) -> Option<Arc<Vec<BookPairCount>>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(cat1.to_string(), cat2.to_string()))
            .cloned()
    }

    pub fn insert(&self, key: (String, String), counts: Arc<Vec<BookPairCount>>) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, counts);
    }

    pub fn invalidate(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl LinkRegistry {
    /// Link counts for every book pair across two categories.
    ///
    /// Pairs with no links are left out. Results are cached until the next
    /// link or index mutation.
    pub fn link_counts(&self, cat1: &str, cat2: &str) -> RegistryResult<Arc<Vec<BookPairCount>>> {
        if let Some(hit) = self.link_counts.get(cat1, cat2) {
            debug!("Link counts cache hit for {} / {}", cat1, cat2);
            return Ok(hit);
        }

        let titles1 = self.explorer_titles(cat1)?;
        let titles2 = self.explorer_titles(cat2)?;

        let mut by_pair: HashMap<(String, String), usize> = HashMap::new();
        for (a, b, count) in links::book_pair_counts(self.db.connection())? {
            *by_pair.entry(unordered(a, b)).or_insert(0) += count;
        }

        let mut results = Vec::new();
        for title1 in &titles1 {
            for title2 in &titles2 {
                let count = by_pair
                    .get(&unordered(title1.clone(), title2.clone()))
                    .copied()
                    .unwrap_or(0);
                if count > 0 {
                    results.push(BookPairCount {
                        book1: hyphenate(title1),
                        book2: hyphenate(title2),
                        count,
                    });
                }
            }
        }

        let results = Arc::new(results);
        self.link_counts
            .insert((cat1.to_string(), cat2.to_string()), Arc::clone(&results));
        Ok(results)
    }

    /// Links between `book` and any title in `category`, split for display
    pub fn book_category_links(
        &self,
        book: &str,
        category: &str,
    ) -> RegistryResult<Vec<BookCategoryLink>> {
        let resolved = self.library.resolve(book)?;
        let book = resolved.book();
        let titles = self.explorer_titles(category)?;
        let found = links::between(self.db.connection(), book, &titles)?;
        debug!(
            "{} link(s) between {} and {} titles in {}",
            found.len(),
            book,
            titles.len(),
            category
        );

        Ok(found
            .iter()
            .map(|link| BookCategoryLink {
                r1: split_ref(&link.refs[0]),
                r2: split_ref(&link.refs[1]),
            })
            .collect())
    }

    fn explorer_titles(&self, category: &str) -> RegistryResult<Vec<String>> {
        let titles = self
            .library
            .titles_for_explorer(category, &self.explorer_excluded);
        if titles.is_empty() {
            return Err(RegistryError::Lookup {
                category: category.to_string(),
            });
        }
        Ok(titles)
    }
}

/// Split a ref at the first space followed by a digit
pub fn split_ref(tref: &str) -> RefParts {
    match REF_PARTS_RE.captures(tref) {
        Some(caps) => RefParts {
            title: hyphenate(&caps["title"]),
            loc: caps["loc"].to_string(),
        },
        None => RefParts {
            title: hyphenate(tref),
            loc: String::new(),
        },
    }
}

fn hyphenate(title: &str) -> String {
    title.replace(' ', "-")
}

fn unordered(a: String, b: String) -> (String, String) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

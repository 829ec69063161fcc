//! Link sets
//!
//! A `LinkSet` is an ordered collection of links, usually every link that
//! touches one ref (see [`crate::LinkRegistry::links_for`]). The query
//! methods here resolve refs through the [`Library`] but never touch storage.

use crate::error::RegistryResult;
use crate::library::Library;
use crate::models::{CategorySummary, Link};
use crate::reference::Ref;

/// An ordered collection of links
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSet {
    links: Vec<Link>,
}

impl LinkSet {
    pub fn new(links: Vec<Link>) -> Self {
        Self { links }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Link> {
        self.links.iter()
    }

    pub fn into_vec(self) -> Vec<Link> {
        self.links
    }

    /// Keep links touching any of `sources`.
    ///
    /// Sources are titles or category names; a category expands to all of its
    /// non-commentary titles. A link is kept when either ref sits at or under
    /// one of the expanded titles.
    pub fn filter<S: AsRef<str>>(&self, library: &Library, sources: &[S]) -> RegistryResult<Vec<Link>> {
        let mut expanded = Vec::new();
        for source in sources {
            let source = source.as_ref();
            if library.is_category(source) {
                expanded.extend(library.titles_in_category(source, false));
            } else {
                expanded.push(source.to_string());
            }
        }

        let anchors = expanded
            .iter()
            .map(|title| library.resolve(title))
            .collect::<RegistryResult<Vec<Ref>>>()?;

        Ok(self
            .links
            .iter()
            .filter(|link| {
                anchors
                    .iter()
                    .any(|a| link.refs.iter().any(|r| a.matches_or_nests(r)))
            })
            .cloned()
            .collect())
    }

    /// Refs opposite `from` (or anything under it) across the set
    pub fn refs_from(&self, library: &Library, from: &Ref) -> Vec<Ref> {
        self.sides_from(from)
            .filter_map(|(_, opposite)| library.resolve(opposite).ok())
            .collect()
    }

    /// `(anchor, opposite)` pairs, where the anchor is the side at or under `from`
    pub fn ref_pairs_from(&self, library: &Library, from: &Ref) -> Vec<(Ref, Ref)> {
        self.sides_from(from)
            .filter_map(|(anchor, opposite)| {
                let anchor = library.resolve(anchor).ok()?;
                let opposite = library.resolve(opposite).ok()?;
                Some((anchor, opposite))
            })
            .collect()
    }

    /// Count links per category of the ref opposite `relative`.
    ///
    /// Categories appear in the order first seen.
    pub fn summary(&self, library: &Library, relative: &Ref) -> Vec<CategorySummary> {
        let relative = relative.normal();
        let mut results: Vec<CategorySummary> = Vec::new();

        for link in &self.links {
            let tref = if link.refs[1] == relative {
                &link.refs[0]
            } else {
                &link.refs[1]
            };
            let Ok(oref) = library.resolve(tref) else {
                continue;
            };
            let Some(category) = library.primary_category(&oref) else {
                continue;
            };

            let i = match results.iter().position(|s| s.name == category) {
                Some(i) => i,
                None => {
                    results.push(CategorySummary {
                        name: category,
                        count: 0,
                        books: Default::default(),
                    });
                    results.len() - 1
                }
            };
            let entry = &mut results[i];
            entry.count += 1;
            *entry.books.entry(oref.book().to_string()).or_insert(0) += 1;
        }

        results
    }

    /// `(anchor, opposite)` ref strings for links with a side under `from`.
    /// The second ref is checked first.
    fn sides_from<'a>(&'a self, from: &'a Ref) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.links.iter().filter_map(move |link| {
            if from.matches_or_nests(&link.refs[1]) {
                Some((link.refs[1].as_str(), link.refs[0].as_str()))
            } else if from.matches_or_nests(&link.refs[0]) {
                Some((link.refs[0].as_str(), link.refs[1].as_str()))
            } else {
                None
            }
        })
    }
}

impl From<Vec<Link>> for LinkSet {
    fn from(links: Vec<Link>) -> Self {
        Self::new(links)
    }
}

impl IntoIterator for LinkSet {
    type Item = Link;
    type IntoIter = std::vec::IntoIter<Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}

impl<'a> IntoIterator for &'a LinkSet {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::tests::sample_library;

    fn set(pairs: &[(&str, &str)]) -> LinkSet {
        pairs
            .iter()
            .map(|(a, b)| Link::new(*a, *b))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_filter_by_title() {
        let lib = sample_library();
        let links = set(&[
            ("Genesis 1:1", "Berakhot 2:1"),
            ("Genesis 1:2", "Isaiah 40:1"),
            ("Genesis 1:3", "Rashi on Genesis 1:3:1"),
        ]);

        let filtered = links.filter(&lib, &["Isaiah"]).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].refs[1], "Isaiah 40:1");

        let filtered = links.filter(&lib, &["Berakhot", "Isaiah"]).unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_filter_by_category_is_union_without_commentary() {
        let lib = sample_library();
        let links = set(&[
            ("Exodus 1:1", "Berakhot 2:1"),
            ("Exodus 1:2", "Shabbat 3:1"),
            ("Exodus 1:3", "Genesis Rabbah 1:1"),
        ]);

        let by_category = links.filter(&lib, &["Talmud"]).unwrap();
        let mut by_titles = links.filter(&lib, &["Berakhot"]).unwrap();
        by_titles.extend(links.filter(&lib, &["Shabbat"]).unwrap());
        assert_eq!(by_category, by_titles);

        // "Tanakh" includes Exodus but not the commentator Rashi
        let commentary = set(&[("Rashi on Genesis 1:1:1", "Berakhot 2:1")]);
        assert!(commentary.filter(&lib, &["Tanakh"]).unwrap().is_empty());
    }

    #[test]
    fn test_filter_unknown_source_fails() {
        let lib = sample_library();
        let links = set(&[("Genesis 1:1", "Exodus 1:1")]);
        let err = links.filter(&lib, &["Nowhere"]).unwrap_err();
        assert!(err.is_invalid_reference());
    }

    #[test]
    fn test_refs_from_pairs() {
        let lib = sample_library();
        let links = set(&[("Exodus 2:2", "Genesis 1:1"), ("Isaiah 1:1", "Exodus 3:3")]);
        let from = lib.resolve("Genesis 1").unwrap();

        let pairs = links.ref_pairs_from(&lib, &from);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.normal(), "Genesis 1:1");
        assert_eq!(pairs[0].1.normal(), "Exodus 2:2");

        let opposite = links.refs_from(&lib, &from);
        assert_eq!(opposite.iter().map(Ref::normal).collect::<Vec<_>>(), vec!["Exodus 2:2"]);
    }

    #[test]
    fn test_refs_from_checks_second_ref_first() {
        let lib = sample_library();
        let links = set(&[("Genesis 1:1", "Genesis 1:5")]);
        let from = lib.resolve("Genesis 1").unwrap();

        let pairs = links.ref_pairs_from(&lib, &from);
        assert_eq!(pairs[0].0.normal(), "Genesis 1:5");
        assert_eq!(pairs[0].1.normal(), "Genesis 1:1");
    }

    #[test]
    fn test_refs_from_skips_unresolvable() {
        let lib = sample_library();
        let links = set(&[("Genesis 1:1", "Lost Book 1:1"), ("Genesis 1:2", "Exodus 1:1")]);
        let from = lib.resolve("Genesis").unwrap();

        let opposite = links.refs_from(&lib, &from);
        assert_eq!(opposite.len(), 1);
        assert_eq!(opposite[0].normal(), "Exodus 1:1");
    }

    #[test]
    fn test_summary() {
        let lib = sample_library();
        let links = set(&[
            ("Genesis 1:1", "Berakhot 2:1"),
            ("Shabbat 3:1", "Genesis 1:1"),
            ("Genesis 1:1", "Berakhot 5:1"),
            ("Genesis 1:1", "Rashi on Genesis 1:1:1"),
            ("Genesis 1:1", "Lost Book 1:1"),
        ]);
        let relative = lib.resolve("Genesis 1:1").unwrap();

        let summary = links.summary(&lib, &relative);
        assert_eq!(summary.len(), 2);

        assert_eq!(summary[0].name, "Talmud");
        assert_eq!(summary[0].count, 3);
        assert_eq!(summary[0].books["Berakhot"], 2);
        assert_eq!(summary[0].books["Shabbat"], 1);

        assert_eq!(summary[1].name, "Commentary");
        assert_eq!(summary[1].count, 1);
        assert_eq!(summary[1].books["Rashi on Genesis"], 1);
    }
}

//! The link registry
//!
//! `LinkRegistry` is the main entry point. It owns the database, the
//! in-memory [`Library`] used to resolve references, and the explorer's
//! link-count cache.
//!
//! ## Usage
//!
//! ```ignore
//! let mut registry = LinkRegistry::open(&config)?;
//!
//! registry.add_index(IndexEntry::new("Genesis", ["Tanakh"], ["Chapter", "Verse"]))?;
//! let saved = registry.save(&Link::new("genesis 1.1", "Berakhot 2:1"))?;
//!
//! let set = registry.links_for(&registry.library().resolve("Genesis 1")?)?;
//! ```

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{RegistryError, RegistryResult};
use crate::explorer::LinkCountCache;
use crate::library::Library;
use crate::link_set::LinkSet;
use crate::models::{IndexEntry, Link, RewriteReport};
use crate::reference::Ref;
use crate::storage::links::book_of;
use crate::storage::{indexes, links, Database};

/// Registry of links between references
pub struct LinkRegistry {
    pub(crate) db: Database,
    pub(crate) library: Library,
    pub(crate) link_counts: LinkCountCache,
    pub(crate) explorer_excluded: Vec<String>,
}

impl LinkRegistry {
    /// Open the registry stored under the configured data directory
    pub fn open(config: &Config) -> RegistryResult<Self> {
        let db = Database::open(config)?;
        Self::with_database(db, config.explorer_excluded.clone())
    }

    /// Open an empty in-memory registry (for testing)
    pub fn open_in_memory() -> RegistryResult<Self> {
        Self::with_database(
            Database::open_in_memory()?,
            Config::default().explorer_excluded,
        )
    }

    /// Wrap an open database, loading its catalog into memory
    pub fn with_database(db: Database, explorer_excluded: Vec<String>) -> RegistryResult<Self> {
        let library = Library::new(indexes::all(db.connection())?);
        debug!("Loaded {} indexes", library.len());
        Ok(Self {
            db,
            library,
            link_counts: LinkCountCache::default(),
            explorer_excluded,
        })
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // ==================== Link Operations ====================

    /// Resolve both refs to canonical form and collapse empty optional fields
    pub fn normalize(&self, link: &Link) -> RegistryResult<Link> {
        let mut normalized = link.clone().with_defaults();
        for r in normalized.refs.iter_mut() {
            *r = self.library.normalize(r)?;
        }
        Ok(normalized)
    }

    /// Whether a link has both refs set and both refs resolve
    pub fn validate(&self, link: &Link) -> bool {
        link.check_fields().is_ok() && link.refs.iter().all(|r| self.library.resolve(r).is_ok())
    }

    /// Persist a link.
    ///
    /// A link with an ID is updated in place. A new link is rejected with
    /// `DuplicateRecord` when the same pair (in either order) or a more
    /// precise pair is already stored. Two duplicate cases still update the
    /// stored link before failing: adding a type to an untyped link, and
    /// attaching generation data to a manual link.
    pub fn save(&mut self, link: &Link) -> RegistryResult<Link> {
        link.check_fields()?;
        let mut link = self.normalize(link)?;

        if link.id.is_some() {
            link.updated_at = Utc::now();
            let conn = self.db.connection();
            if !links::update(conn, &link)? {
                links::insert(conn, &link)?;
            }
            self.link_counts.invalidate();
            debug!("Updated link {} - {}", link.refs[0], link.refs[1]);
            return Ok(link);
        }

        let resolved = [
            self.library.resolve(&link.refs[0])?,
            self.library.resolve(&link.refs[1])?,
        ];

        let tx = self.db.write_transaction()?;

        if let Some(mut existing) = links::find_pair(&tx, &link.refs[0], &link.refs[1])? {
            if !existing.has_type() && link.has_type() && !link.auto {
                existing.set_type(link.link_type.clone());
                links::update(&tx, &existing)?;
                tx.commit()?;
                self.link_counts.invalidate();
                info!("Added type to existing link {} - {}", existing.refs[0], existing.refs[1]);
                return Err(RegistryError::DuplicateRecord(format!(
                    "Updated existing link with new type: {} - {}",
                    link.refs[0], link.refs[1]
                )));
            }

            if !existing.auto && link.auto {
                existing.adopt_generation(&link);
                links::update(&tx, &existing)?;
                tx.commit()?;
                self.link_counts.invalidate();
                info!(
                    "Added generation data to existing link {} - {}",
                    existing.refs[0], existing.refs[1]
                );
                return Err(RegistryError::DuplicateRecord(format!(
                    "Updated existing link with auto generation data {} - {}",
                    link.refs[0], link.refs[1]
                )));
            }

            return Err(RegistryError::DuplicateRecord(format!(
                "Link already exists {} - {}. Try editing instead.",
                link.refs[0], link.refs[1]
            )));
        }

        let mut books = vec![resolved[0].book().to_string()];
        if resolved[1].book() != resolved[0].book() {
            books.push(resolved[1].book().to_string());
        }
        if let Some(precise) = links::with_books(&tx, &books)?
            .into_iter()
            .find(|candidate| nests_under(&candidate.refs, &resolved))
        {
            debug!(
                "Rejecting {} - {} in favour of {} - {}",
                link.refs[0], link.refs[1], precise.refs[0], precise.refs[1]
            );
            return Err(RegistryError::DuplicateRecord(format!(
                "A more precise link already exists: {} - {}",
                precise.refs[0], precise.refs[1]
            )));
        }

        let now = Utc::now();
        link.id = Some(Uuid::new_v4());
        link.created_at = now;
        link.updated_at = now;
        links::insert(&tx, &link)?;
        tx.commit()?;

        self.link_counts.invalidate();
        info!("Saved link {} - {}", link.refs[0], link.refs[1]);
        Ok(link)
    }

    /// Get a link by ID
    pub fn get(&self, id: Uuid) -> RegistryResult<Option<Link>> {
        links::get(self.db.connection(), id)
    }

    /// Delete a link by ID
    pub fn delete(&mut self, id: Uuid) -> RegistryResult<()> {
        if !links::delete(self.db.connection(), id)? {
            return Err(RegistryError::NotFound(format!("link {}", id)));
        }
        self.link_counts.invalidate();
        info!("Deleted link {}", id);
        Ok(())
    }

    /// Every link in insertion order
    pub fn all_links(&self) -> RegistryResult<Vec<Link>> {
        links::all(self.db.connection())
    }

    pub fn link_count(&self) -> RegistryResult<i64> {
        links::count(self.db.connection())
    }

    /// Every link with a ref at or under `tref`
    pub fn links_for(&self, tref: &Ref) -> RegistryResult<LinkSet> {
        let candidates = links::with_books(self.db.connection(), &[tref.book().to_string()])?;
        Ok(candidates
            .into_iter()
            .filter(|l| l.refs.iter().any(|r| tref.matches_or_nests(r)))
            .collect::<Vec<_>>()
            .into())
    }

    // ==================== Index Hooks ====================

    /// Rewrite links after `index` was renamed from `old` to `new`.
    ///
    /// The catalog must already know the new title. Links whose rewritten refs
    /// no longer resolve, or collide with an existing pair, are deleted.
    pub fn rewrite_on_title_change(
        &mut self,
        index: &IndexEntry,
        old: &str,
        new: &str,
    ) -> RegistryResult<RewriteReport> {
        let matcher = TitleMatcher::new(&self.library, index, old);
        let mut report = RewriteReport::default();

        for link in matcher.candidates(&self.db)? {
            let mut rewritten = link.clone();
            for r in rewritten.refs.iter_mut() {
                if matcher.matches(r) {
                    *r = r.replacen(old, new, 1);
                }
            }

            match self.save(&rewritten) {
                Ok(_) => report.rewritten += 1,
                Err(e) if e.is_invalid_reference() || e.is_duplicate() => {
                    warn!(
                        "Deleting link {} - {} after rename of {}: {}",
                        link.refs[0], link.refs[1], old, e
                    );
                    if let Some(id) = link.id {
                        links::delete(self.db.connection(), id)?;
                    }
                    report.deleted += 1;
                }
                Err(e) => return Err(e),
            }
        }

        self.link_counts.invalidate();
        info!(
            "Renamed {} to {}: {} link(s) rewritten, {} deleted",
            old, new, report.rewritten, report.deleted
        );
        Ok(report)
    }

    /// Delete every link that points into `index`, returning how many
    pub fn delete_on_title_removal(&mut self, index: &IndexEntry) -> RegistryResult<usize> {
        let matcher = TitleMatcher::new(&self.library, index, &index.title);
        let mut deleted = 0;
        for link in matcher.candidates(&self.db)? {
            if link.refs.iter().any(|r| matcher.matches(r)) {
                if let Some(id) = link.id {
                    if links::delete(self.db.connection(), id)? {
                        deleted += 1;
                    }
                }
            }
        }

        self.link_counts.invalidate();
        info!("Removed {}: {} link(s) deleted", index.title, deleted);
        Ok(deleted)
    }

    /// Add or replace an index in the catalog.
    ///
    /// Replacing keeps the stored title; a change of case goes through
    /// [`Self::rename_index`] so links are rewritten.
    pub fn add_index(&mut self, mut entry: IndexEntry) -> RegistryResult<()> {
        if entry.title.trim().is_empty() {
            return Err(RegistryError::InvalidRecord("index title is empty".to_string()));
        }
        if let Some(existing) = self.library.get(&entry.title) {
            if existing.title != entry.title {
                debug!("Keeping stored title {} over {}", existing.title, entry.title);
                entry.title = existing.title.clone();
            }
        }
        indexes::upsert(self.db.connection(), &entry)?;
        info!("Stored index {}", entry.title);
        self.library.insert(entry);
        self.link_counts.invalidate();
        Ok(())
    }

    /// Rename an index and rewrite the links that point into it
    pub fn rename_index(&mut self, old: &str, new: &str) -> RegistryResult<RewriteReport> {
        let old_title = self
            .library
            .get(old)
            .map(|e| e.title.clone())
            .ok_or_else(|| RegistryError::NotFound(format!("index '{}'", old)))?;
        if new.trim().is_empty() {
            return Err(RegistryError::InvalidRecord("index title is empty".to_string()));
        }
        if let Some(clash) = self.library.get(new) {
            if !clash.title.eq_ignore_ascii_case(&old_title) {
                return Err(RegistryError::DuplicateRecord(format!(
                    "Index already exists: {}",
                    clash.title
                )));
            }
        }

        indexes::rename(self.db.connection(), &old_title, new)?;
        let entry = self
            .library
            .rename(&old_title, new)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("index '{}'", old)))?;
        self.rewrite_on_title_change(&entry, &old_title, new)
    }

    /// Remove an index and delete the links that point into it
    pub fn remove_index(&mut self, title: &str) -> RegistryResult<usize> {
        let entry = self
            .library
            .get(title)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("index '{}'", title)))?;
        indexes::delete(self.db.connection(), &entry.title)?;
        self.library.remove(&entry.title);
        self.delete_on_title_removal(&entry)
    }

    pub fn index_count(&self) -> RegistryResult<i64> {
        indexes::count(self.db.connection())
    }
}

/// Whether a stored pair nests under the resolved pair, in either orientation
fn nests_under(stored: &[String; 2], new: &[Ref; 2]) -> bool {
    (new[0].matches_or_nests(&stored[0]) && new[1].matches_or_nests(&stored[1]))
        || (new[0].matches_or_nests(&stored[1]) && new[1].matches_or_nests(&stored[0]))
}

/// Selects the refs that belong to a title.
///
/// For a commentator that is every `"<title> on ..."` ref. For any other
/// index it is refs in the title itself or in `"<commentator> on <title>"`.
struct TitleMatcher {
    prefix: Option<String>,
    books: Vec<String>,
}

impl TitleMatcher {
    fn new(library: &Library, index: &IndexEntry, title: &str) -> Self {
        if index.is_commentary() {
            return Self {
                prefix: Some(format!("{} on ", title)),
                books: Vec::new(),
            };
        }

        let mut books = vec![title.to_string()];
        books.extend(
            library
                .commentators()
                .into_iter()
                .map(|c| format!("{} on {}", c, title)),
        );
        Self {
            prefix: None,
            books,
        }
    }

    fn matches(&self, tref: &str) -> bool {
        match &self.prefix {
            Some(prefix) => tref.starts_with(prefix.as_str()),
            None => {
                let book = book_of(tref);
                self.books.iter().any(|b| *b == book)
            }
        }
    }

    fn candidates(&self, db: &Database) -> RegistryResult<Vec<Link>> {
        match &self.prefix {
            Some(prefix) => links::with_book_prefix(db.connection(), prefix),
            None => links::with_books(db.connection(), &self.books),
        }
    }
}

//! Data models for crossref
//!
//! Defines the core data structures: `Link` (a cross-reference between two
//! canonical references), `IndexEntry` (a catalog record for one text), and
//! the result shapes returned by summary and explorer queries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RegistryError, RegistryResult};

/// First category of every commentator index
pub const COMMENTARY_CATEGORY: &str = "Commentary";

/// A connection between two references
///
/// Order of `refs` carries no meaning, but positions are preserved as given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    /// Persistent identifier, assigned on first save
    #[serde(default)]
    pub id: Option<Uuid>,
    /// The two references this link connects
    pub refs: [String; 2],
    /// Connection category, e.g. "commentary" or "quotation"
    #[serde(default, rename = "type")]
    pub link_type: Option<String>,
    /// Free-text annotation
    #[serde(default)]
    pub anchor_text: Option<String>,
    /// Whether an automated process generated this link
    #[serde(default)]
    pub auto: bool,
    /// Name of the generating process
    #[serde(default)]
    pub generated_by: Option<String>,
    /// Identifier of the source text used to generate the link
    #[serde(default)]
    pub source_text_id: Option<String>,
    /// When this link was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// When this link was last updated
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Link {
    /// Create a new, unsaved link between two references
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            refs: [first.into(), second.into()],
            link_type: None,
            anchor_text: None,
            auto: false,
            generated_by: None,
            source_text_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the connection category
    pub fn with_type(mut self, link_type: impl Into<String>) -> Self {
        self.set_type(Some(link_type.into()));
        self
    }

    /// Set the anchor text
    pub fn with_anchor_text(mut self, anchor_text: impl Into<String>) -> Self {
        self.anchor_text = non_empty(Some(anchor_text.into()));
        self
    }

    /// Mark the link as produced by an automated process
    pub fn generated(
        mut self,
        generated_by: impl Into<String>,
        source_text_id: Option<String>,
    ) -> Self {
        self.auto = true;
        self.generated_by = non_empty(Some(generated_by.into()));
        self.source_text_id = non_empty(source_text_id);
        self
    }

    /// Update the connection category
    pub fn set_type(&mut self, link_type: Option<String>) {
        self.link_type = non_empty(link_type);
        self.updated_at = Utc::now();
    }

    /// Copy the automated-generation fields from another link
    pub fn adopt_generation(&mut self, other: &Link) {
        self.auto = other.auto;
        self.generated_by = other.generated_by.clone();
        self.source_text_id = other.source_text_id.clone();
        self.updated_at = Utc::now();
    }

    /// Whether a connection category is set
    pub fn has_type(&self) -> bool {
        self.link_type.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Collapse empty optional strings to `None`
    pub fn with_defaults(mut self) -> Self {
        self.link_type = non_empty(self.link_type);
        self.anchor_text = non_empty(self.anchor_text);
        self.generated_by = non_empty(self.generated_by);
        self.source_text_id = non_empty(self.source_text_id);
        self
    }

    /// Structural validation shared by every write path
    pub fn check_fields(&self) -> RegistryResult<()> {
        for (i, r) in self.refs.iter().enumerate() {
            if r.trim().is_empty() {
                return Err(RegistryError::InvalidRecord(format!("refs[{}] is empty", i)));
            }
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A catalog record describing one text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexEntry {
    /// Canonical title
    pub title: String,
    /// Classification path, primary category first
    pub categories: Vec<String>,
    /// Names of the addressing levels, e.g. ["Chapter", "Verse"]
    #[serde(default)]
    pub section_names: Vec<String>,
}

impl IndexEntry {
    pub fn new<C, S>(title: impl Into<String>, categories: C, section_names: S) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            title: title.into(),
            categories: categories.into_iter().map(Into::into).collect(),
            section_names: section_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this index is a commentator whose refs read "<title> on <base>"
    pub fn is_commentary(&self) -> bool {
        self.primary_category() == Some(COMMENTARY_CATEGORY)
    }

    pub fn primary_category(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }

    pub fn in_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Number of addressable section levels
    pub fn depth(&self) -> usize {
        self.section_names.len()
    }
}

/// Per-category link counts relative to one reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategorySummary {
    pub name: String,
    pub count: usize,
    pub books: BTreeMap<String, usize>,
}

/// Link count between two books, titles hyphenated for presentation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookPairCount {
    pub book1: String,
    pub book2: String,
    pub count: usize,
}

/// A reference split into its title and location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefParts {
    pub title: String,
    pub loc: String,
}

/// One link between a book and a category, as shown by the explorer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookCategoryLink {
    pub r1: RefParts,
    pub r2: RefParts,
}

/// Outcome of rewriting links after a title change
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewriteReport {
    /// Links saved under the new title
    pub rewritten: usize,
    /// Links deleted because they no longer resolved
    pub deleted: usize,
}

//! Crossref Core Library
//!
//! This crate provides the core functionality for crossref, a registry of
//! links between references in a library of structured texts.
//!
//! # Architecture
//!
//! - **SQLite**: Document store for links and the index catalog
//! - **Library**: In-memory catalog that resolves raw citations to canonical refs
//!
//! Duplicate detection runs inside an IMMEDIATE transaction and is backed by a
//! unique index on the unordered ref pair.
//!
//! # Quick Start
//!
//! ```text
//! let mut registry = LinkRegistry::open(&Config::load()?)?;
//!
//! // Register a text and link two of its passages
//! registry.add_index(IndexEntry::new("Genesis", ["Tanakh"], ["Chapter", "Verse"]))?;
//! registry.save(&Link::new("Genesis 1:1", "Genesis 2:4"))?;
//!
//! // Query links
//! let chapter = registry.library().resolve("Genesis 1")?;
//! let set = registry.links_for(&chapter)?;
//! ```
//!
//! # Modules
//!
//! - `registry`: Link registry (main entry point)
//! - `link_set`: Queries over a set of links
//! - `explorer`: Book/category link counts
//! - `library`: Reference resolution and catalog queries
//! - `reference`: Canonical references and nesting
//! - `models`: Data structures for links, indexes, and query results
//! - `storage`: SQLite persistence
//! - `config`: Application configuration

pub mod config;
pub mod error;
pub mod explorer;
pub mod library;
pub mod link_set;
pub mod models;
pub mod reference;
pub mod registry;
pub mod storage;

pub use config::Config;
pub use error::{RegistryError, RegistryResult};
pub use explorer::LinkCountCache;
pub use library::Library;
pub use link_set::LinkSet;
pub use models::{
    BookCategoryLink, BookPairCount, CategorySummary, IndexEntry, Link, RefParts, RewriteReport,
};
pub use reference::Ref;
pub use registry::LinkRegistry;
pub use storage::Database;

//! Storage layer
//!
//! SQLite plays the document store: a `links` collection and an `indexes`
//! (catalog) collection.
//!
//! ## Layout
//!
//! - `database`: connection handle and write transactions
//! - `schema`: table definitions and versioning
//! - `links` / `indexes`: query functions over a `Connection`

pub mod database;
pub mod indexes;
pub mod links;
pub mod schema;

pub use database::Database;
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};

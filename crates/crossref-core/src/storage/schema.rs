//! SQLite schema for the link and index collections
//!
//! `links` stores each ref next to its book title so candidate links for a
//! title can be fetched by index before nesting is checked in Rust. The
//! unordered ref pair is unique, which makes duplicate detection atomic.

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Links table
        CREATE TABLE IF NOT EXISTS links (
            id TEXT PRIMARY KEY,
            ref_a TEXT NOT NULL,
            ref_b TEXT NOT NULL,
            book_a TEXT NOT NULL,
            book_b TEXT NOT NULL,
            link_type TEXT,
            anchor_text TEXT,
            auto INTEGER NOT NULL DEFAULT 0,
            generated_by TEXT,
            source_text_id TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Catalog of texts
        CREATE TABLE IF NOT EXISTS indexes (
            title TEXT PRIMARY KEY COLLATE NOCASE,
            categories TEXT NOT NULL,
            section_names TEXT NOT NULL,
            position INTEGER NOT NULL
        );

        -- One link per unordered ref pair
        CREATE UNIQUE INDEX IF NOT EXISTS idx_links_pair
            ON links(min(ref_a, ref_b), max(ref_a, ref_b));

        -- Candidate lookups by book title
        CREATE INDEX IF NOT EXISTS idx_links_book_a ON links(book_a);
        CREATE INDEX IF NOT EXISTS idx_links_book_b ON links(book_b);

        -- Query by creation date (for sorting)
        CREATE INDEX IF NOT EXISTS idx_links_created_at ON links(created_at);
        "#,
    )?;

    // Set schema version
    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"links".to_string()));
        assert!(tables.contains(&"indexes".to_string()));
        assert!(tables.contains(&"schema_info".to_string()));
    }

    #[test]
    fn test_schema_version() {
        let conn = Connection::open_in_memory().unwrap();

        assert!(needs_init(&conn));

        init_schema(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
        assert!(!needs_init(&conn));
    }

    #[test]
    fn test_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_pair_is_unique_in_either_order() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let insert = "INSERT INTO links (id, ref_a, ref_b, book_a, book_b, created_at, updated_at)
                      VALUES (?, ?, ?, 'x', 'y', 0, 0)";
        conn.execute(insert, ["1", "Genesis 1:1", "Exodus 2:2"])
            .unwrap();
        assert!(conn
            .execute(insert, ["2", "Exodus 2:2", "Genesis 1:1"])
            .is_err());
        assert!(conn
            .execute(insert, ["3", "Genesis 1:1", "Exodus 2:3"])
            .is_ok());
    }

    #[test]
    fn test_indexes_exist() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(indexes.contains(&"idx_links_pair".to_string()));
        assert!(indexes.contains(&"idx_links_book_a".to_string()));
        assert!(indexes.contains(&"idx_links_book_b".to_string()));
    }
}

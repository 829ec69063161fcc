//! Index (catalog) collection queries

use rusqlite::{params, Connection};

use crate::error::RegistryResult;
use crate::models::IndexEntry;

/// Get every index in catalog order
pub fn all(conn: &Connection) -> RegistryResult<Vec<IndexEntry>> {
    let mut stmt =
        conn.prepare("SELECT title, categories, section_names FROM indexes ORDER BY position")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(title, categories, section_names)| -> RegistryResult<IndexEntry> {
            Ok(IndexEntry {
                title,
                categories: serde_json::from_str(&categories)?,
                section_names: serde_json::from_str(&section_names)?,
            })
        })
        .collect()
}

/// Insert an index or replace the one with the same title, keeping its
/// position and stored title
pub fn upsert(conn: &Connection, entry: &IndexEntry) -> RegistryResult<()> {
    conn.execute(
        r#"
        INSERT INTO indexes (title, categories, section_names, position)
        VALUES (?1, ?2, ?3, (SELECT COALESCE(MAX(position) + 1, 0) FROM indexes))
        ON CONFLICT(title) DO UPDATE SET
            categories = excluded.categories,
            section_names = excluded.section_names
        "#,
        params![
            entry.title,
            serde_json::to_string(&entry.categories)?,
            serde_json::to_string(&entry.section_names)?,
        ],
    )?;
    Ok(())
}

/// Rename an index, returning whether it existed
pub fn rename(conn: &Connection, old: &str, new: &str) -> RegistryResult<bool> {
    let changed = conn.execute(
        "UPDATE indexes SET title = ?2 WHERE title = ?1",
        params![old, new],
    )?;
    Ok(changed > 0)
}

/// Delete an index, returning whether it existed
pub fn delete(conn: &Connection, title: &str) -> RegistryResult<bool> {
    let changed = conn.execute("DELETE FROM indexes WHERE title = ?", params![title])?;
    Ok(changed > 0)
}

pub fn count(conn: &Connection) -> RegistryResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM indexes", [], |row| row.get(0))
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::init_schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_upsert_keeps_order() {
        let conn = conn();
        upsert(&conn, &IndexEntry::new("Genesis", ["Tanakh"], ["Chapter", "Verse"])).unwrap();
        upsert(&conn, &IndexEntry::new("Exodus", ["Tanakh"], ["Chapter", "Verse"])).unwrap();
        upsert(&conn, &IndexEntry::new("genesis", ["Tanakh", "Torah"], ["Chapter", "Verse"])).unwrap();

        let entries = all(&conn).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Genesis");
        assert_eq!(entries[0].categories, vec!["Tanakh", "Torah"]);
        assert_eq!(entries[1].title, "Exodus");
        assert_eq!(count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_rename_and_delete() {
        let conn = conn();
        upsert(&conn, &IndexEntry::new("Exodus", ["Tanakh"], ["Chapter", "Verse"])).unwrap();

        assert!(rename(&conn, "Exodus", "Shemot").unwrap());
        assert!(!rename(&conn, "Exodus", "Shemot").unwrap());
        assert_eq!(all(&conn).unwrap()[0].title, "Shemot");

        assert!(delete(&conn, "shemot").unwrap());
        assert_eq!(count(&conn).unwrap(), 0);
    }
}

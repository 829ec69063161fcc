//! Link collection queries
//!
//! Free functions over a `Connection` so the same queries run either on the
//! database handle or inside a write transaction (`Transaction` derefs to
//! `Connection`).

use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use uuid::Uuid;

use crate::error::{RegistryError, RegistryResult};
use crate::models::Link;
use crate::reference::Ref;

const LINK_COLUMNS: &str = "id, ref_a, ref_b, link_type, anchor_text, auto, generated_by, \
                            source_text_id, created_at, updated_at";

/// Book title of a stored ref, or the whole string when it is not canonical
pub fn book_of(tref: &str) -> String {
    Ref::parse_canonical(tref)
        .map(|r| r.book().to_string())
        .unwrap_or_else(|| tref.to_string())
}

/// Find the link for an unordered ref pair
pub fn find_pair(conn: &Connection, a: &str, b: &str) -> RegistryResult<Option<Link>> {
    let sql = format!(
        "SELECT {} FROM links WHERE min(ref_a, ref_b) = min(?1, ?2) AND max(ref_a, ref_b) = max(?1, ?2)",
        LINK_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params![a, b], row_to_link)?;
    Ok(rows.next().transpose()?)
}

/// Get a link by ID
pub fn get(conn: &Connection, id: Uuid) -> RegistryResult<Option<Link>> {
    let sql = format!("SELECT {} FROM links WHERE id = ?", LINK_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params![id.to_string()], row_to_link)?;
    Ok(rows.next().transpose()?)
}

/// Get all links in insertion order
pub fn all(conn: &Connection) -> RegistryResult<Vec<Link>> {
    let sql = format!("SELECT {} FROM links ORDER BY created_at, rowid", LINK_COLUMNS);
    collect(conn, &sql, params![])
}

/// Links where either ref belongs to one of `books`
pub fn with_books(conn: &Connection, books: &[String]) -> RegistryResult<Vec<Link>> {
    if books.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = placeholders(1, books.len());
    let sql = format!(
        "SELECT {} FROM links WHERE book_a IN ({p}) OR book_b IN ({p}) ORDER BY created_at, rowid",
        LINK_COLUMNS,
        p = placeholders
    );
    collect(conn, &sql, params_from_iter(books.iter()))
}

/// Links where either book title starts with `prefix`
pub fn with_book_prefix(conn: &Connection, prefix: &str) -> RegistryResult<Vec<Link>> {
    let pattern = format!("{}%", escape_like(prefix));
    let sql = format!(
        "SELECT {} FROM links WHERE book_a LIKE ?1 ESCAPE '\\' OR book_b LIKE ?1 ESCAPE '\\' \
         ORDER BY created_at, rowid",
        LINK_COLUMNS
    );
    // LIKE ignores ASCII case; keep exact prefixes only
    let links = collect(conn, &sql, params![pattern])?;
    Ok(links
        .into_iter()
        .filter(|l| l.refs.iter().any(|r| book_of(r).starts_with(prefix)))
        .collect())
}

/// Links with one ref in `book` and the other in any of `others`
pub fn between(conn: &Connection, book: &str, others: &[String]) -> RegistryResult<Vec<Link>> {
    if others.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = placeholders(2, others.len());
    let sql = format!(
        "SELECT {} FROM links \
         WHERE (book_a = ?1 AND book_b IN ({p})) OR (book_b = ?1 AND book_a IN ({p})) \
         ORDER BY created_at, rowid",
        LINK_COLUMNS,
        p = placeholders
    );
    let values = std::iter::once(book).chain(others.iter().map(String::as_str));
    collect(conn, &sql, params_from_iter(values))
}

/// Link counts grouped by the (book_a, book_b) pair as stored.
/// Links with a whole-book ref on either side are not counted.
pub fn book_pair_counts(conn: &Connection) -> RegistryResult<Vec<(String, String, usize)>> {
    let mut stmt = conn.prepare(
        "SELECT book_a, book_b, COUNT(*) FROM links \
         WHERE ref_a != book_a AND ref_b != book_b \
         GROUP BY book_a, book_b",
    )?;
    let counts = stmt
        .query_map([], |row| {
            let count: i64 = row.get(2)?;
            Ok((row.get(0)?, row.get(1)?, count as usize))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(counts)
}

pub fn count(conn: &Connection) -> RegistryResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))
        .map_err(Into::into)
}

/// Insert a link that already carries an ID
pub fn insert(conn: &Connection, link: &Link) -> RegistryResult<()> {
    let id = link
        .id
        .ok_or_else(|| RegistryError::InvalidRecord("link has no id".to_string()))?;
    conn.execute(
        r#"
        INSERT INTO links (id, ref_a, ref_b, book_a, book_b, link_type, anchor_text,
                           auto, generated_by, source_text_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            id.to_string(),
            link.refs[0],
            link.refs[1],
            book_of(&link.refs[0]),
            book_of(&link.refs[1]),
            link.link_type,
            link.anchor_text,
            link.auto,
            link.generated_by,
            link.source_text_id,
            link.created_at.timestamp_millis(),
            link.updated_at.timestamp_millis(),
        ],
    )
    .map_err(|e| pair_conflict(e, link))?;
    Ok(())
}

/// Update a link in place, returning whether a row matched its ID
pub fn update(conn: &Connection, link: &Link) -> RegistryResult<bool> {
    let id = link
        .id
        .ok_or_else(|| RegistryError::InvalidRecord("link has no id".to_string()))?;
    let changed = conn
        .execute(
            r#"
            UPDATE links SET ref_a = ?2, ref_b = ?3, book_a = ?4, book_b = ?5,
                             link_type = ?6, anchor_text = ?7, auto = ?8,
                             generated_by = ?9, source_text_id = ?10, updated_at = ?11
            WHERE id = ?1
            "#,
            params![
                id.to_string(),
                link.refs[0],
                link.refs[1],
                book_of(&link.refs[0]),
                book_of(&link.refs[1]),
                link.link_type,
                link.anchor_text,
                link.auto,
                link.generated_by,
                link.source_text_id,
                link.updated_at.timestamp_millis(),
            ],
        )
        .map_err(|e| pair_conflict(e, link))?;
    Ok(changed > 0)
}

/// Delete a link, returning whether it existed
pub fn delete(conn: &Connection, id: Uuid) -> RegistryResult<bool> {
    let changed = conn.execute("DELETE FROM links WHERE id = ?", params![id.to_string()])?;
    Ok(changed > 0)
}

// ==================== Private helpers ====================

fn collect<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> RegistryResult<Vec<Link>> {
    let mut stmt = conn.prepare(sql)?;
    let links = stmt
        .query_map(params, row_to_link)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(links)
}

fn row_to_link(row: &Row<'_>) -> rusqlite::Result<Link> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at: i64 = row.get(8)?;
    let updated_at: i64 = row.get(9)?;

    Ok(Link {
        id: Some(id),
        refs: [row.get(1)?, row.get(2)?],
        link_type: row.get(3)?,
        anchor_text: row.get(4)?,
        auto: row.get(5)?,
        generated_by: row.get(6)?,
        source_text_id: row.get(7)?,
        created_at: chrono::DateTime::from_timestamp_millis(created_at)
            .unwrap_or_else(chrono::Utc::now),
        updated_at: chrono::DateTime::from_timestamp_millis(updated_at)
            .unwrap_or_else(chrono::Utc::now),
    })
}

/// Map a unique-pair violation to `DuplicateRecord`
fn pair_conflict(error: rusqlite::Error, link: &Link) -> RegistryError {
    match &error {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            RegistryError::DuplicateRecord(format!(
                "Link already exists {} - {}. Try editing instead.",
                link.refs[0], link.refs[1]
            ))
        }
        _ => RegistryError::Database(error),
    }
}

/// `?start, ?start+1, ...` numbered placeholders
fn placeholders(start: usize, n: usize) -> String {
    (start..start + n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
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

    fn saved(a: &str, b: &str) -> Link {
        let mut link = Link::new(a, b);
        link.id = Some(Uuid::new_v4());
        link
    }

    #[test]
    fn test_book_of() {
        assert_eq!(book_of("Genesis 1:1"), "Genesis");
        assert_eq!(book_of("Rashi on Genesis 1:1:1"), "Rashi on Genesis");
        assert_eq!(book_of("Genesis"), "Genesis");
    }

    #[test]
    fn test_insert_and_get() {
        let conn = conn();
        let link = saved("Genesis 1:1", "Exodus 2:2").with_type("quotation");
        insert(&conn, &link).unwrap();

        let loaded = get(&conn, link.id.unwrap()).unwrap().unwrap();
        assert_eq!(loaded.refs, link.refs);
        assert_eq!(loaded.link_type.as_deref(), Some("quotation"));
        assert!(!loaded.auto);
        assert_eq!(count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_find_pair_is_unordered() {
        let conn = conn();
        insert(&conn, &saved("Genesis 1:1", "Exodus 2:2")).unwrap();

        assert!(find_pair(&conn, "Exodus 2:2", "Genesis 1:1").unwrap().is_some());
        assert!(find_pair(&conn, "Genesis 1:1", "Exodus 2:3").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_insert_maps_to_duplicate_record() {
        let conn = conn();
        insert(&conn, &saved("Genesis 1:1", "Exodus 2:2")).unwrap();
        let err = insert(&conn, &saved("Exodus 2:2", "Genesis 1:1")).unwrap_err();
        assert!(err.is_duplicate());
    }

    #[test]
    fn test_update_and_delete() {
        let conn = conn();
        let mut link = saved("Genesis 1:1", "Exodus 2:2");
        insert(&conn, &link).unwrap();

        link.refs[1] = "Isaiah 1:1".to_string();
        assert!(update(&conn, &link).unwrap());
        let loaded = get(&conn, link.id.unwrap()).unwrap().unwrap();
        assert_eq!(loaded.refs[1], "Isaiah 1:1");
        assert_eq!(with_books(&conn, &["Isaiah".to_string()]).unwrap().len(), 1);

        assert!(delete(&conn, link.id.unwrap()).unwrap());
        assert!(!delete(&conn, link.id.unwrap()).unwrap());
        assert!(!update(&conn, &link).unwrap());
    }

    #[test]
    fn test_with_book_prefix_is_exact() {
        let conn = conn();
        insert(&conn, &saved("Rashi on Genesis 1:1:1", "Genesis 1:1")).unwrap();
        insert(&conn, &saved("rashi on Exodus 1:1:1", "Exodus 1:1")).unwrap();
        insert(&conn, &saved("Rashi_X 1:1", "Exodus 1:2")).unwrap();

        let links = with_book_prefix(&conn, "Rashi on ").unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].refs[0], "Rashi on Genesis 1:1:1");
    }

    #[test]
    fn test_between_and_pair_counts() {
        let conn = conn();
        insert(&conn, &saved("Genesis 1:1", "Berakhot 2:1")).unwrap();
        insert(&conn, &saved("Shabbat 3:1", "Genesis 2:2")).unwrap();
        insert(&conn, &saved("Exodus 1:1", "Berakhot 2:2")).unwrap();

        let talmud = vec!["Berakhot".to_string(), "Shabbat".to_string()];
        assert_eq!(between(&conn, "Genesis", &talmud).unwrap().len(), 2);
        assert!(between(&conn, "Genesis", &[]).unwrap().is_empty());

        let counts = book_pair_counts(&conn).unwrap();
        assert_eq!(counts.len(), 3);
        assert!(counts.contains(&("Genesis".to_string(), "Berakhot".to_string(), 1)));
    }

    #[test]
    fn test_all_in_insertion_order() {
        let conn = conn();
        let first = saved("Genesis 1:1", "Exodus 1:1");
        let second = saved("Genesis 1:2", "Exodus 1:2");
        insert(&conn, &first).unwrap();
        insert(&conn, &second).unwrap();

        let all = all(&conn).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[1].id, second.id);
    }
}

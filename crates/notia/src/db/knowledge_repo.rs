//! Knowledge base repository.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use serde::Serialize;

use super::{format_timestamp, parse_timestamp, Database, DatabaseError};

/// A stored knowledge entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created: String = row.get(4)?;
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            source: row.get(3)?,
            created_at: parse_timestamp(4, &created)?,
        })
    }
}

/// Inserts an entry and returns the stored record.
pub fn insert(
    db: &Database,
    title: &str,
    content: &str,
    source: &str,
) -> Result<KnowledgeRecord, DatabaseError> {
    db.with_conn(|conn| {
        let created_at = super::now();
        conn.execute(
            "INSERT INTO knowledge_base (title, content, source, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![title, content, source, format_timestamp(&created_at)],
        )?;
        Ok(KnowledgeRecord {
            id: conn.last_insert_rowid(),
            title: title.to_string(),
            content: content.to_string(),
            source: source.to_string(),
            created_at,
        })
    })
}

/// Lists all entries, newest first.
pub fn list_all(db: &Database) -> Result<Vec<KnowledgeRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, title, content, source, created_at FROM knowledge_base
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], KnowledgeRecord::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    })
}

/// Case-insensitive substring search over title or content, newest first.
///
/// Matching folds case in Rust; SQLite's `LIKE` only folds ASCII.
pub fn search(db: &Database, keyword: &str) -> Result<Vec<KnowledgeRecord>, DatabaseError> {
    let needle = keyword.to_lowercase();
    let hits = list_all(db)?
        .into_iter()
        .filter(|entry| {
            entry.title.to_lowercase().contains(&needle)
                || entry.content.to_lowercase().contains(&needle)
        })
        .collect();
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    #[test]
    fn test_insert_and_list() {
        let db = test_db();
        let first = insert(&db, "VPN", "Use the office VPN", "user").unwrap();
        let second = insert(&db, "Printer", "Floor 3", "user").unwrap();
        assert!(second.id > first.id);

        let all = list_all(&db).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1], first);
    }

    #[test]
    fn test_search_title_or_content() {
        let db = test_db();
        insert(&db, "VPN setup", "steps", "user").unwrap();
        insert(&db, "Expenses", "Submit via the vpn portal", "user").unwrap();
        insert(&db, "Lunch", "Canteen opens at noon", "user").unwrap();

        let hits = search(&db, "vpn").unwrap();
        assert_eq!(hits.len(), 2);
        assert!(search(&db, "holiday").unwrap().is_empty());
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let db = test_db();
        insert(&db, "Discount", "50% off", "user").unwrap();
        insert(&db, "Plain", "nothing here", "user").unwrap();
        insert(&db, "snake_case", "naming", "user").unwrap();

        let hits = search(&db, "%").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Discount");

        let hits = search(&db, "_").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "snake_case");
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let db = test_db();
        insert(&db, "Éclair", "Pastry shop on ÖSTERGATAN", "user").unwrap();
        insert(&db, "Lunch", "Canteen", "user").unwrap();

        let hits = search(&db, "éclair").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Éclair");
        assert_eq!(search(&db, "östergatan").unwrap().len(), 1);
    }
}

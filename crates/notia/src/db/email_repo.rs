//! Email repository: persistence for classified messages in the `emails` table.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::Serialize;

use super::task_repo::{self, NewTask};
use super::{format_timestamp, parse_timestamp, Database, DatabaseError};
use crate::model::{Category, ClassificationResult, NormalizedMessage};

/// Default page size for [`query`].
pub const DEFAULT_LIMIT: u32 = 50;

const SELECT_COLUMNS: &str = "id, external_id, title, sender, received_time, body, category,
     raw_model_output, created_at";

/// A stored email row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub sender: String,
    pub received_time: DateTime<Utc>,
    pub body: String,
    pub category: Category,
    pub raw_model_output: String,
    pub created_at: DateTime<Utc>,
}

impl EmailRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let received: String = row.get(4)?;
        let created: String = row.get(8)?;
        Ok(Self {
            id: row.get(0)?,
            external_id: row.get(1)?,
            title: row.get(2)?,
            sender: row.get(3)?,
            received_time: parse_timestamp(4, &received)?,
            body: row.get(5)?,
            category: row.get(6)?,
            raw_model_output: row.get(7)?,
            created_at: parse_timestamp(8, &created)?,
        })
    }
}

/// Values for a new `emails` row.
#[derive(Debug, Clone)]
pub struct NewEmail {
    pub external_id: String,
    pub title: String,
    pub sender: String,
    pub received_time: DateTime<Utc>,
    pub body: String,
    pub category: Category,
    pub raw_model_output: String,
}

impl NewEmail {
    pub fn from_classified(message: &NormalizedMessage, result: &ClassificationResult) -> Self {
        Self {
            external_id: message.external_id.clone(),
            title: message.title.clone(),
            sender: message.sender.clone(),
            received_time: message.received_time,
            body: message.body.clone(),
            category: result.category,
            raw_model_output: result.raw_model_output.clone(),
        }
    }
}

/// Result of a check-and-insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted { email_id: i64, task_id: Option<i64> },
    AlreadyPresent,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted { .. })
    }
}

/// Filter for listing emails.
#[derive(Debug, Clone, Default)]
pub struct EmailFilter {
    pub category: Option<Category>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Returns true when an email with this external id is stored.
pub fn exists(db: &Database, external_id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| Ok(exists_with_conn(conn, external_id)?))
}

fn exists_with_conn(conn: &Connection, external_id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM emails WHERE external_id = ?1",
        params![external_id],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

/// Inserts an email unless one with the same external id already exists.
pub fn insert(db: &Database, email: &NewEmail) -> Result<InsertOutcome, DatabaseError> {
    insert_with_task(db, email, None)
}

/// Inserts an email and, optionally, its derived task in one transaction.
///
/// The existence check and the inserts share the transaction; a concurrent
/// writer that wins the race is caught by the UNIQUE constraint and reported
/// as [`InsertOutcome::AlreadyPresent`].
pub fn insert_with_task(
    db: &Database,
    email: &NewEmail,
    task: Option<&NewTask>,
) -> Result<InsertOutcome, DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;

        if exists_with_conn(&tx, &email.external_id)? {
            return Ok(InsertOutcome::AlreadyPresent);
        }

        let inserted = tx.execute(
            "INSERT INTO emails (external_id, title, sender, received_time, body, category,
                                 raw_model_output, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                email.external_id,
                email.title,
                email.sender,
                format_timestamp(&email.received_time),
                email.body,
                email.category,
                email.raw_model_output,
                format_timestamp(&super::now()),
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                log::debug!(
                    "Email {} inserted concurrently, skipping",
                    email.external_id
                );
                return Ok(InsertOutcome::AlreadyPresent);
            }
            Err(e) => return Err(e.into()),
        }
        let email_id = tx.last_insert_rowid();

        let task_id = match task {
            Some(task) => Some(task_repo::insert_with_conn(&tx, task)?),
            None => None,
        };

        tx.commit()?;
        Ok(InsertOutcome::Inserted { email_id, task_id })
    })
}

/// Looks up a stored email by its external id.
pub fn find_by_external_id(
    db: &Database,
    external_id: &str,
) -> Result<Option<EmailRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let sql = format!("SELECT {} FROM emails WHERE external_id = ?1", SELECT_COLUMNS);
        let record = conn
            .query_row(&sql, params![external_id], EmailRecord::from_row)
            .optional()?;
        Ok(record)
    })
}

/// Lists emails, newest received first.
pub fn query(db: &Database, filter: &EmailFilter) -> Result<Vec<EmailRecord>, DatabaseError> {
    let limit = filter.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = filter.offset.unwrap_or(0);

    db.with_conn(|conn| {
        let records = match filter.category {
            Some(category) => {
                let sql = format!(
                    "SELECT {} FROM emails WHERE category = ?1
                     ORDER BY received_time DESC, id DESC LIMIT ?2 OFFSET ?3",
                    SELECT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![category, limit, offset], EmailRecord::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM emails
                     ORDER BY received_time DESC, id DESC LIMIT ?1 OFFSET ?2",
                    SELECT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![limit, offset], EmailRecord::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(records)
    })
}

/// Counts all stored emails.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM emails", [], |r| r.get(0))?;
        Ok(count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskStatus;
    use chrono::TimeZone;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample_email(external_id: &str, category: Category, hour: u32) -> NewEmail {
        NewEmail {
            external_id: external_id.to_string(),
            title: format!("Subject {}", external_id),
            sender: "alice@example.com".to_string(),
            received_time: Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap(),
            body: "body".to_string(),
            category,
            raw_model_output: category.label().to_string(),
        }
    }

    #[test]
    fn test_insert_and_exists() {
        let db = test_db();
        assert!(!exists(&db, "1:1").unwrap());

        let outcome = insert(&db, &sample_email("1:1", Category::News, 8)).unwrap();
        assert!(outcome.is_inserted());
        assert!(exists(&db, "1:1").unwrap());
        assert_eq!(count(&db).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_insert_is_reported() {
        let db = test_db();
        let email = sample_email("1:1", Category::News, 8);
        insert(&db, &email).unwrap();

        let outcome = insert(&db, &email).unwrap();
        assert_eq!(outcome, InsertOutcome::AlreadyPresent);
        assert_eq!(count(&db).unwrap(), 1);
    }

    #[test]
    fn test_insert_with_task_links_rows() {
        let db = test_db();
        let email = sample_email("1:5", Category::Task, 9);
        let task = NewTask::from_email(&email);

        let outcome = insert_with_task(&db, &email, Some(&task)).unwrap();
        let InsertOutcome::Inserted { task_id, .. } = outcome else {
            panic!("expected insert");
        };
        let task = task_repo::find_by_id(&db, task_id.unwrap()).unwrap();
        assert_eq!(task.external_id.as_deref(), Some("1:5"));
        assert_eq!(task.status, TaskStatus::NotStarted);

        // A second attempt creates neither an email nor a task.
        let again = insert_with_task(&db, &email, Some(&NewTask::from_email(&email))).unwrap();
        assert_eq!(again, InsertOutcome::AlreadyPresent);
        assert_eq!(task_repo::count(&db).unwrap(), 1);
    }

    #[test]
    fn test_find_by_external_id_round_trips() {
        let db = test_db();
        let email = sample_email("7:42", Category::Unclassified, 10);
        insert(&db, &email).unwrap();

        let stored = find_by_external_id(&db, "7:42").unwrap().unwrap();
        assert_eq!(stored.title, email.title);
        assert_eq!(stored.received_time, email.received_time);
        assert_eq!(stored.category, Category::Unclassified);
        assert!(find_by_external_id(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_query_orders_and_filters() {
        let db = test_db();
        insert(&db, &sample_email("1:1", Category::News, 8)).unwrap();
        insert(&db, &sample_email("1:2", Category::Task, 10)).unwrap();
        insert(&db, &sample_email("1:3", Category::News, 9)).unwrap();

        let all = query(&db, &EmailFilter::default()).unwrap();
        let ids: Vec<_> = all.iter().map(|e| e.external_id.as_str()).collect();
        assert_eq!(ids, vec!["1:2", "1:3", "1:1"]);

        let news = query(
            &db,
            &EmailFilter {
                category: Some(Category::News),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(news.len(), 2);
        assert!(news.iter().all(|e| e.category == Category::News));

        let page = query(
            &db,
            &EmailFilter {
                category: None,
                limit: Some(1),
                offset: Some(1),
            },
        )
        .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].external_id, "1:3");
    }
}

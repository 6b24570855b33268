//! Task repository: CRUD operations for the `tasks` table.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::email_repo::NewEmail;
use super::{format_timestamp, parse_timestamp, Database, DatabaseError};
use crate::model::{ParseEnumError, TaskStatus};

const SELECT_COLUMNS: &str = "id, external_id, title, sender, received_time, feedback_deadline,
     body, feedback_content, status, created_at, updated_at";

/// A stored task row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: i64,
    /// Originating email. `None` for manually created tasks.
    pub external_id: Option<String>,
    pub title: String,
    pub sender: String,
    pub received_time: DateTime<Utc>,
    pub feedback_deadline: Option<DateTime<Utc>>,
    pub body: String,
    pub feedback_content: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let received: String = row.get(4)?;
        let deadline: Option<String> = row.get(5)?;
        let created: String = row.get(9)?;
        let updated: String = row.get(10)?;
        Ok(Self {
            id: row.get(0)?,
            external_id: row.get(1)?,
            title: row.get(2)?,
            sender: row.get(3)?,
            received_time: parse_timestamp(4, &received)?,
            feedback_deadline: deadline
                .as_deref()
                .map(|raw| parse_timestamp(5, raw))
                .transpose()?,
            body: row.get(6)?,
            feedback_content: row.get(7)?,
            status: row.get(8)?,
            created_at: parse_timestamp(9, &created)?,
            updated_at: parse_timestamp(10, &updated)?,
        })
    }
}

/// Values for a new `tasks` row.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub external_id: Option<String>,
    pub title: String,
    pub sender: String,
    pub received_time: DateTime<Utc>,
    pub feedback_deadline: Option<DateTime<Utc>>,
    pub body: String,
    pub feedback_content: Option<String>,
    pub status: TaskStatus,
}

impl NewTask {
    /// Task derived from a TASK-classified email: not started, no deadline.
    pub fn from_email(email: &NewEmail) -> Self {
        Self {
            external_id: Some(email.external_id.clone()),
            title: email.title.clone(),
            sender: email.sender.clone(),
            received_time: email.received_time,
            feedback_deadline: None,
            body: email.body.clone(),
            feedback_content: None,
            status: TaskStatus::NotStarted,
        }
    }
}

/// Time column used to order task listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskOrder {
    #[default]
    ReceivedTime,
    FeedbackDeadline,
    CreatedAt,
}

impl TaskOrder {
    pub fn column(&self) -> &'static str {
        match self {
            TaskOrder::ReceivedTime => "received_time",
            TaskOrder::FeedbackDeadline => "feedback_deadline",
            TaskOrder::CreatedAt => "created_at",
        }
    }
}

impl FromStr for TaskOrder {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "received_time" => Ok(TaskOrder::ReceivedTime),
            "feedback_deadline" => Ok(TaskOrder::FeedbackDeadline),
            "created_at" => Ok(TaskOrder::CreatedAt),
            _ => Err(ParseEnumError {
                kind: "order_by",
                value: s.to_string(),
                expected: "received_time, feedback_deadline, created_at",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        })
    }
}

impl FromStr for SortDirection {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(ParseEnumError {
                kind: "direction",
                value: s.to_string(),
                expected: "asc, desc",
            }),
        }
    }
}

/// Filter and ordering for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub order_by: TaskOrder,
    pub direction: SortDirection,
}

/// Inserts a task and returns its id.
pub fn insert(db: &Database, task: &NewTask) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| Ok(insert_with_conn(conn, task)?))
}

/// Inserts a task on an existing connection or transaction.
pub(crate) fn insert_with_conn(conn: &Connection, task: &NewTask) -> rusqlite::Result<i64> {
    let now = format_timestamp(&super::now());
    conn.execute(
        "INSERT INTO tasks (external_id, title, sender, received_time, feedback_deadline, body,
                            feedback_content, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            task.external_id,
            task.title,
            task.sender,
            format_timestamp(&task.received_time),
            task.feedback_deadline.as_ref().map(format_timestamp),
            task.body,
            task.feedback_content,
            task.status,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Finds a task by id.
pub fn find_by_id(db: &Database, id: i64) -> Result<TaskRecord, DatabaseError> {
    db.with_conn(|conn| find_by_id_with_conn(conn, id))
}

fn find_by_id_with_conn(conn: &Connection, id: i64) -> Result<TaskRecord, DatabaseError> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?1", SELECT_COLUMNS);
    conn.query_row(&sql, params![id], TaskRecord::from_row)
        .optional()?
        .ok_or(DatabaseError::NotFound { table: "tasks", id })
}

/// Sets a task's status and refreshes `updated_at`.
///
/// `updated_at` always moves forward: if the clock has not advanced past
/// the stored value, the new value is the stored one plus one microsecond.
pub fn update_status(
    db: &Database,
    id: i64,
    status: TaskStatus,
) -> Result<TaskRecord, DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;

        let prior: Option<String> = tx
            .query_row(
                "SELECT updated_at FROM tasks WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?;
        let prior = match prior {
            Some(raw) => parse_timestamp(0, &raw)?,
            None => return Err(DatabaseError::NotFound { table: "tasks", id }),
        };

        let mut updated_at = super::now();
        if updated_at <= prior {
            updated_at = prior + Duration::microseconds(1);
        }

        tx.execute(
            "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status, format_timestamp(&updated_at), id],
        )?;

        let record = find_by_id_with_conn(&tx, id)?;
        tx.commit()?;

        log::debug!("Task {} status set to {}", id, status);
        Ok(record)
    })
}

/// Lists tasks, optionally filtered by status, ordered by a time column.
pub fn query(db: &Database, filter: &TaskFilter) -> Result<Vec<TaskRecord>, DatabaseError> {
    // Column and direction come from closed enums, never from user text.
    let order = format!(
        "ORDER BY {col} IS NULL, {col} {dir}, id {dir}",
        col = filter.order_by.column(),
        dir = filter.direction
    );

    db.with_conn(|conn| {
        let records = match filter.status {
            Some(status) => {
                let sql = format!(
                    "SELECT {} FROM tasks WHERE status = ?1 {}",
                    SELECT_COLUMNS, order
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![status], TaskRecord::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!("SELECT {} FROM tasks {}", SELECT_COLUMNS, order);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], TaskRecord::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(records)
    })
}

/// Tasks not yet completed, earliest deadline first, undated last.
pub fn find_pending(db: &Database) -> Result<Vec<TaskRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let sql = format!(
            "SELECT {} FROM tasks WHERE status IN ('NOT_STARTED', 'IN_PROGRESS')
             ORDER BY feedback_deadline IS NULL, feedback_deadline ASC, id ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], TaskRecord::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    })
}

/// Tasks past their deadline that are not completed.
pub fn find_overdue(db: &Database, now: &DateTime<Utc>) -> Result<Vec<TaskRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let sql = format!(
            "SELECT {} FROM tasks
             WHERE feedback_deadline IS NOT NULL AND feedback_deadline < ?1
               AND status != 'COMPLETED'
             ORDER BY feedback_deadline ASC, id ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![format_timestamp(now)], TaskRecord::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    })
}

/// Counts all tasks.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM tasks", [], |r| r.get(0))?;
        Ok(count)
    })
}

//! Aggregate counts over emails and tasks.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{Database, DatabaseError};
use crate::model::{Category, TaskStatus};

/// Counts keyed by canonical enum names. Every enum value is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub total_emails: u64,
    pub by_category: BTreeMap<String, u64>,
    pub task_status: BTreeMap<String, u64>,
}

/// Computes the current snapshot.
pub fn snapshot(db: &Database) -> Result<StatisticsSnapshot, DatabaseError> {
    db.with_conn(|conn| {
        let total_emails: u64 = conn.query_row("SELECT COUNT(*) FROM emails", [], |r| r.get(0))?;

        let mut by_category: BTreeMap<String, u64> = Category::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), 0))
            .collect();
        let mut stmt = conn.prepare("SELECT category, COUNT(*) FROM emails GROUP BY category")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, u64>(1)?)))?;
        for row in rows {
            let (category, count) = row?;
            by_category.insert(category, count);
        }

        let mut task_status: BTreeMap<String, u64> = TaskStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM tasks GROUP BY status")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, u64>(1)?)))?;
        for row in rows {
            let (status, count) = row?;
            task_status.insert(status, count);
        }

        Ok(StatisticsSnapshot {
            total_emails,
            by_category,
            task_status,
        })
    })
}

//! Domain types shared by the decoder, classifier, pipeline and store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A decoded, encoding-independent email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMessage {
    /// Mailbox-assigned identifier, unique per mailbox.
    pub external_id: String,
    pub title: String,
    pub sender: String,
    pub received_time: DateTime<Utc>,
    /// Plain-text body. Empty when the message has no text/plain part.
    pub body: String,
}

/// Closed set of labels an email can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    News,
    Task,
    Unclassified,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::News, Category::Task, Category::Unclassified];

    /// Canonical storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::News => "NEWS",
            Category::Task => "TASK",
            Category::Unclassified => "UNCLASSIFIED",
        }
    }

    /// Display label, also the marker the model is asked to answer with.
    pub fn label(&self) -> &'static str {
        match self {
            Category::News => "资讯类",
            Category::Task => "任务类",
            Category::Unclassified => "无法分类",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value '{value}' (expected one of: {expected})")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed) || c.label() == trimmed)
            .ok_or_else(|| ParseEnumError {
                kind: "category",
                value: s.to_string(),
                expected: "NEWS, TASK, UNCLASSIFIED",
            })
    }
}

/// Lifecycle of a task derived from an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "NOT_STARTED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "未开始",
            TaskStatus::InProgress => "进行中",
            TaskStatus::Completed => "已完成",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        TaskStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(trimmed) || st.label() == trimmed)
            .ok_or_else(|| ParseEnumError {
                kind: "task status",
                value: s.to_string(),
                expected: "NOT_STARTED, IN_PROGRESS, COMPLETED",
            })
    }
}

/// Output of the classifier for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub category: Category,
    /// Free text returned by the model, or a diagnostic placeholder on failure.
    pub raw_model_output: String,
}

impl ClassificationResult {
    pub fn new(category: Category, raw_model_output: impl Into<String>) -> Self {
        Self {
            category,
            raw_model_output: raw_model_output.into(),
        }
    }
}

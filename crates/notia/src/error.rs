use std::path::PathBuf;
use thiserror::Error;

use crate::ai::ModelError;
use crate::db::DatabaseError;
use crate::email::EmailError;
use crate::model::ParseEnumError;
use crate::secrets::SecretError;

#[derive(Error, Debug)]
pub enum NotiaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(DatabaseError),

    #[error("Mailbox error: {0}")]
    Email(#[from] EmailError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Credential error: {0}")]
    Secret(#[from] SecretError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: i64 },

    #[error("An ingestion run is already in progress")]
    Busy,
}

impl From<DatabaseError> for NotiaError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { table, id } => NotiaError::NotFound {
                resource: resource_name(table),
                id,
            },
            other => NotiaError::Database(other),
        }
    }
}

impl From<ParseEnumError> for NotiaError {
    fn from(err: ParseEnumError) -> Self {
        NotiaError::Validation(err.to_string())
    }
}

fn resource_name(table: &'static str) -> &'static str {
    match table {
        "tasks" => "Task",
        "emails" => "Email",
        "knowledge_base" => "Knowledge entry",
        other => other,
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

pub type Result<T> = std::result::Result<T, NotiaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_not_found_maps_to_not_found() {
        let err: NotiaError = DatabaseError::NotFound {
            table: "tasks",
            id: 12,
        }
        .into();
        assert!(matches!(
            err,
            NotiaError::NotFound {
                resource: "Task",
                id: 12
            }
        ));
        assert_eq!(err.to_string(), "Task 12 not found");
    }

    #[test]
    fn test_other_database_errors_stay_database() {
        let err: NotiaError = DatabaseError::LockPoisoned.into();
        assert!(matches!(err, NotiaError::Database(_)));
    }
}

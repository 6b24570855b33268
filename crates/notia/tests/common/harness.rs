//! Test harness for isolated test execution.
//!
//! Each harness owns a temporary directory holding a fresh SQLite database,
//! so tests never share state.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use notia::config::{Config, MailboxConfig};
use notia::{
    Classifier, Database, IngestionPipeline, LanguageModel, NotiaService, PipelineConfig,
};

pub struct TestHarness {
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub db: Database,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("notia.db");
        let db = Database::open(&db_path).expect("Failed to open database");
        Self {
            temp_dir,
            db_path,
            db,
        }
    }

    /// Pipeline over the harness database with a short mailbox timeout.
    pub fn pipeline(&self, model: Arc<dyn LanguageModel>, batch_size: usize) -> IngestionPipeline {
        let classifier = Arc::new(Classifier::new(model, Duration::from_secs(5)));
        IngestionPipeline::new(
            self.db.clone(),
            classifier,
            PipelineConfig {
                batch_size,
                mailbox_timeout: Duration::from_millis(500),
            },
        )
    }

    /// Service with a complete mailbox section pointing at the harness database.
    pub fn service(&self, model: Arc<dyn LanguageModel>) -> NotiaService {
        let config = Config {
            database_path: Some(self.db_path.display().to_string()),
            mailbox: Some(MailboxConfig {
                host: "imap.example.com".to_string(),
                username: "me@example.com".to_string(),
                password: Some("secret".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        NotiaService::new(self.db.clone(), config, model)
    }

    /// Reopens the database file, as a restarted process would.
    pub fn reopen(&self) -> Database {
        Database::open(&self.db_path).expect("Failed to reopen database")
    }
}

//! The service object hosts share: one database handle, one model runtime
//! and one ingestion pipeline, built once from configuration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, info_span, Instrument};

use crate::ai::{build_model, generate_with_timeout, LanguageModel};
use crate::classifier::Classifier;
use crate::config::Config;
use crate::db::email_repo::{self, EmailFilter, EmailRecord};
use crate::db::knowledge_repo::{self, KnowledgeRecord};
use crate::db::stats_repo::{self, StatisticsSnapshot};
use crate::db::task_repo::{self, NewTask, TaskFilter, TaskRecord};
use crate::db::Database;
use crate::email::{ImapClient, Mailbox};
use crate::error::{NotiaError, Result};
use crate::model::TaskStatus;
use crate::pipeline::{IngestionPipeline, IngestionSummary, PipelineConfig};

/// Source recorded for knowledge entries added without one.
pub const DEFAULT_KNOWLEDGE_SOURCE: &str = "user";

/// A manually created task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub feedback_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub feedback_content: Option<String>,
}

pub struct NotiaService {
    db: Database,
    config: Config,
    model: Arc<dyn LanguageModel>,
    model_timeout: Duration,
    pipeline: IngestionPipeline,
    ingest_running: AtomicBool,
}

impl NotiaService {
    /// Opens the configured database and builds the configured model runtime.
    pub fn from_config(config: Config) -> Result<Self> {
        let path = config.resolved_database_path().ok_or_else(|| {
            NotiaError::Validation("cannot determine database path".to_string())
        })?;
        let db = Database::open(&path)?;
        let model = build_model(&config.model)?;
        info!(backend = model.name(), database = %path.display(), "Service initialized");
        Ok(Self::new(db, config, model))
    }

    pub fn new(db: Database, config: Config, model: Arc<dyn LanguageModel>) -> Self {
        let model_timeout = Duration::from_secs(config.model.timeout_secs.max(1));
        let classifier = Arc::new(Classifier::new(Arc::clone(&model), model_timeout));
        let pipeline_config = config
            .mailbox
            .as_ref()
            .map(PipelineConfig::from_mailbox)
            .unwrap_or_default();

        Self {
            pipeline: IngestionPipeline::new(db.clone(), classifier, pipeline_config),
            db,
            config,
            model,
            model_timeout,
            ingest_running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn is_ingesting(&self) -> bool {
        self.ingest_running.load(Ordering::Acquire)
    }

    // -- Emails --

    pub fn list_emails(&self, filter: &EmailFilter) -> Result<Vec<EmailRecord>> {
        Ok(email_repo::query(&self.db, filter)?)
    }

    // -- Tasks --

    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>> {
        Ok(task_repo::query(&self.db, filter)?)
    }

    pub fn pending_tasks(&self) -> Result<Vec<TaskRecord>> {
        Ok(task_repo::find_pending(&self.db)?)
    }

    pub fn overdue_tasks(&self) -> Result<Vec<TaskRecord>> {
        Ok(task_repo::find_overdue(&self.db, &Utc::now())?)
    }

    pub fn create_task(&self, request: CreateTaskRequest) -> Result<TaskRecord> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(NotiaError::Validation("title is required".to_string()));
        }

        let task = NewTask {
            external_id: None,
            title: title.to_string(),
            sender: request.sender,
            received_time: Utc::now(),
            feedback_deadline: request.feedback_deadline,
            body: request.body,
            feedback_content: request.feedback_content.filter(|c| !c.trim().is_empty()),
            status: TaskStatus::NotStarted,
        };
        let id = task_repo::insert(&self.db, &task)?;
        Ok(task_repo::find_by_id(&self.db, id)?)
    }

    /// Sets a task's status from its textual name.
    pub fn update_task_status(&self, id: i64, status: &str) -> Result<TaskRecord> {
        let status: TaskStatus = status.parse()?;
        Ok(task_repo::update_status(&self.db, id, status)?)
    }

    // -- Knowledge --

    pub fn add_knowledge(
        &self,
        title: &str,
        content: &str,
        source: Option<&str>,
    ) -> Result<KnowledgeRecord> {
        let title = title.trim();
        if title.is_empty() {
            return Err(NotiaError::Validation("title is required".to_string()));
        }
        if content.trim().is_empty() {
            return Err(NotiaError::Validation("content is required".to_string()));
        }
        let source = source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_KNOWLEDGE_SOURCE);

        Ok(knowledge_repo::insert(&self.db, title, content, source)?)
    }

    pub fn list_knowledge(&self) -> Result<Vec<KnowledgeRecord>> {
        Ok(knowledge_repo::list_all(&self.db)?)
    }

    pub fn search_knowledge(&self, query: &str) -> Result<Vec<KnowledgeRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(NotiaError::Validation("query is required".to_string()));
        }
        Ok(knowledge_repo::search(&self.db, query)?)
    }

    // -- Statistics --

    pub fn statistics(&self) -> Result<StatisticsSnapshot> {
        Ok(stats_repo::snapshot(&self.db)?)
    }

    // -- Chat --

    /// Free-form question answered by the configured model.
    pub async fn chat(&self, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(NotiaError::Validation("message is required".to_string()));
        }
        let reply = generate_with_timeout(self.model.as_ref(), message, self.model_timeout).await?;
        Ok(reply.trim().to_string())
    }

    // -- Ingestion --

    /// Runs one ingestion batch against the configured IMAP mailbox.
    pub async fn trigger_ingestion(&self) -> Result<IngestionSummary> {
        let mailbox = self.config.ready_mailbox().ok_or_else(|| {
            NotiaError::Validation(
                "mailbox is not configured (host, username and a credential are required)"
                    .to_string(),
            )
        })?;
        let mut client = ImapClient::new(mailbox.clone());
        self.run_ingestion_with(&mut client).await
    }

    /// Runs one ingestion batch against any mailbox. Only one run may be
    /// active at a time.
    pub async fn run_ingestion_with(&self, mailbox: &mut dyn Mailbox) -> Result<IngestionSummary> {
        let _guard = IngestGuard::acquire(&self.ingest_running).ok_or(NotiaError::Busy)?;

        let summary = self
            .pipeline
            .run_default(mailbox)
            .instrument(info_span!("ingest_trigger"))
            .await;
        Ok(summary)
    }
}

/// Holds the single-run flag; releases it on drop, including on panic.
struct IngestGuard<'a>(&'a AtomicBool);

impl<'a> IngestGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for IngestGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

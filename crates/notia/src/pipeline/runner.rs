use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::classifier::Classifier;
use crate::db::email_repo::{self, InsertOutcome, NewEmail};
use crate::db::task_repo::NewTask;
use crate::db::Database;
use crate::email::{EmailError, Mailbox, MessageDecoder};
use crate::model::{Category, ClassificationResult, NormalizedMessage};

use super::config::PipelineConfig;
use super::error::PipelineError;

/// A message persisted by the current run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestedMessage {
    #[serde(flatten)]
    pub message: NormalizedMessage,
    #[serde(flatten)]
    pub classification: ClassificationResult,
    pub email_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionSummary {
    /// Newly persisted messages. Equals `records.len()`.
    pub processed_count: usize,
    /// Messages already stored by an earlier run.
    pub skipped_count: usize,
    /// Messages that failed to fetch, decode or persist.
    pub failed_count: usize,
    pub records: Vec<IngestedMessage>,
}

enum MessageOutcome {
    Processed(IngestedMessage),
    Skipped,
}

pub struct IngestionPipeline {
    db: Database,
    classifier: Arc<Classifier>,
    decoder: MessageDecoder,
    config: PipelineConfig,
}

impl IngestionPipeline {
    pub fn new(db: Database, classifier: Arc<Classifier>, config: PipelineConfig) -> Self {
        Self {
            db,
            classifier,
            decoder: MessageDecoder::new(),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one batch with the configured batch size.
    pub async fn run_default(&self, mailbox: &mut dyn Mailbox) -> IngestionSummary {
        self.run(mailbox, self.config.batch_size).await
    }

    /// Fetches, classifies and stores at most `max_batch_size` of the most
    /// recent unread messages.
    ///
    /// Never fails: a mailbox that cannot be reached yields an empty summary
    /// and per-message failures are counted and logged.
    pub async fn run(&self, mailbox: &mut dyn Mailbox, max_batch_size: usize) -> IngestionSummary {
        let span = info_span!("ingest_run", max_batch_size);
        self.run_inner(mailbox, max_batch_size.max(1))
            .instrument(span)
            .await
    }

    async fn run_inner(&self, mailbox: &mut dyn Mailbox, max_batch_size: usize) -> IngestionSummary {
        let timeout = self.config.mailbox_timeout;
        let mut summary = IngestionSummary::default();

        if let Err(e) = with_timeout(timeout, "connect", mailbox.connect()).await {
            error!(error = %e, "Mailbox connection failed, ending run");
            return summary;
        }

        let uids = match with_timeout(timeout, "list unread", mailbox.list_unread()).await {
            Ok(uids) => uids,
            Err(e) => {
                error!(error = %e, "Listing unread messages failed, ending run");
                close(mailbox, timeout).await;
                return summary;
            }
        };

        let selected = select_recent(uids, max_batch_size);
        info!(selected = selected.len(), "Processing unread messages");

        for uid in selected {
            let span = info_span!("ingest_message", uid);
            match self.process_message(mailbox, uid).instrument(span).await {
                Ok(MessageOutcome::Processed(record)) => {
                    summary.processed_count += 1;
                    summary.records.push(record);
                }
                Ok(MessageOutcome::Skipped) => summary.skipped_count += 1,
                Err(e) => {
                    warn!(uid, error = %e, "Message failed, continuing with next");
                    summary.failed_count += 1;

                    if matches!(e, PipelineError::Fetch(EmailError::Timeout(_))) {
                        mailbox.abandon();
                        if let Err(e) = with_timeout(timeout, "reconnect", mailbox.connect()).await {
                            error!(error = %e, "Reconnect after fetch timeout failed, ending run");
                            break;
                        }
                    }
                }
            }
        }

        close(mailbox, timeout).await;

        info!(
            processed = summary.processed_count,
            skipped = summary.skipped_count,
            failed = summary.failed_count,
            "Ingestion run finished"
        );
        summary
    }

    async fn process_message(
        &self,
        mailbox: &mut dyn Mailbox,
        uid: u32,
    ) -> Result<MessageOutcome, PipelineError> {
        let external_id = mailbox.external_id(uid);

        if email_repo::exists(&self.db, &external_id)? {
            debug!(external_id = %external_id, "Already stored, skipping");
            return Ok(MessageOutcome::Skipped);
        }

        let raw = with_timeout(self.config.mailbox_timeout, "fetch", mailbox.fetch(uid))
            .await
            .map_err(PipelineError::Fetch)?;

        let message = self
            .decoder
            .decode(&raw, &external_id)
            .map_err(PipelineError::Decode)?;

        let classification = self.classifier.classify(&message).await;

        let email = NewEmail::from_classified(&message, &classification);
        let task = (classification.category == Category::Task).then(|| NewTask::from_email(&email));

        match email_repo::insert_with_task(&self.db, &email, task.as_ref())? {
            InsertOutcome::Inserted { email_id, task_id } => {
                debug!(
                    external_id = %external_id,
                    category = %classification.category,
                    email_id,
                    "Stored message"
                );
                Ok(MessageOutcome::Processed(IngestedMessage {
                    message,
                    classification,
                    email_id,
                    task_id,
                }))
            }
            InsertOutcome::AlreadyPresent => Ok(MessageOutcome::Skipped),
        }
    }
}

/// The `limit` highest UIDs, ascending.
fn select_recent(mut uids: Vec<u32>, limit: usize) -> Vec<u32> {
    uids.sort_unstable();
    uids.dedup();
    let start = uids.len().saturating_sub(limit);
    uids.split_off(start)
}

async fn with_timeout<T, F>(timeout: Duration, operation: &str, fut: F) -> Result<T, EmailError>
where
    F: Future<Output = Result<T, EmailError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(EmailError::Timeout(format!(
            "{} exceeded {}s",
            operation,
            timeout.as_secs_f32()
        ))),
    }
}

async fn close(mailbox: &mut dyn Mailbox, timeout: Duration) {
    if let Err(e) = with_timeout(timeout, "logout", mailbox.disconnect()).await {
        warn!(error = %e, "Mailbox logout failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_recent_keeps_highest_uids() {
        let uids: Vec<u32> = (1..=15).rev().collect();
        assert_eq!(select_recent(uids, 10), (6..=15).collect::<Vec<_>>());
    }

    #[test]
    fn test_select_recent_short_list() {
        assert_eq!(select_recent(vec![3, 1, 3, 2], 10), vec![1, 2, 3]);
        assert!(select_recent(Vec::new(), 10).is_empty());
    }

    #[tokio::test]
    async fn test_with_timeout_maps_elapsed() {
        let result: Result<(), EmailError> = with_timeout(
            Duration::from_millis(10),
            "fetch",
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            },
        )
        .await;
        assert!(matches!(result, Err(EmailError::Timeout(_))));
    }
}

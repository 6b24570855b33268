use std::time::Duration;

use crate::config::MailboxConfig;

pub struct PipelineConfig {
    /// Most recent unread messages taken per run.
    pub batch_size: usize,
    /// Deadline for each mailbox round-trip (connect, list, fetch, logout).
    pub mailbox_timeout: Duration,
}

impl PipelineConfig {
    pub fn from_mailbox(mailbox: &MailboxConfig) -> Self {
        Self {
            batch_size: mailbox.batch_size.max(1),
            mailbox_timeout: Duration::from_secs(mailbox.timeout_secs.max(1)),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_mailbox(&MailboxConfig::default())
    }
}

//! The mailbox seam the ingestion pipeline drives.

use async_trait::async_trait;

use super::error::Result;

/// A source of unread messages addressed by numeric UID.
///
/// [`ImapClient`](super::ImapClient) is the production implementation;
/// tests substitute an in-memory mailbox.
#[async_trait]
pub trait Mailbox: Send {
    /// Opens the session and selects the configured folder.
    async fn connect(&mut self) -> Result<()>;

    /// UIDs of unread messages, ascending (oldest first).
    async fn list_unread(&mut self) -> Result<Vec<u32>>;

    /// Raw RFC 822 bytes of one message.
    async fn fetch(&mut self, uid: u32) -> Result<Vec<u8>>;

    async fn disconnect(&mut self) -> Result<()>;

    /// Drops the session without a logout. Called after an operation was
    /// cancelled mid-flight, when the session may still hold a late reply.
    /// The next operation needs a fresh [`connect`](Mailbox::connect).
    fn abandon(&mut self) {}

    /// Stable identifier persisted as the email's natural key.
    fn external_id(&self, uid: u32) -> String {
        uid.to_string()
    }
}

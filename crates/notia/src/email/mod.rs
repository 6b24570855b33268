//! Mailbox access and message decoding.
//!
//! [`ImapClient`] reads unread mail over IMAP/TLS with password login.
//! [`MessageDecoder`] turns the raw bytes into a [`NormalizedMessage`](crate::model::NormalizedMessage).

pub mod client;
pub mod decoder;
pub mod error;
pub mod mailbox;

pub use client::ImapClient;
pub use decoder::MessageDecoder;
pub use error::EmailError;
pub use mailbox::Mailbox;

//! IMAP client for the configured mailbox.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_imap::Session;
use async_native_tls::TlsConnector;
use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};

use crate::config::MailboxConfig;

use super::error::{EmailError, Result};
use super::mailbox::Mailbox;

/// Type alias for the underlying async stream (using async-std compatible TcpStream).
type AsyncTcpStream = async_io::Async<TcpStream>;

/// Type alias for the TLS stream used by the IMAP session.
type TlsStream = async_native_tls::TlsStream<AsyncTcpStream>;

/// IMAP client that reads unread mail from one folder over TLS.
pub struct ImapClient {
    session: Option<Session<TlsStream>>,
    config: MailboxConfig,
    uidvalidity: Option<u32>,
}

impl ImapClient {
    pub fn new(config: MailboxConfig) -> Self {
        Self {
            session: None,
            config,
            uidvalidity: None,
        }
    }

    /// Connects to the IMAP server, logs in and selects the folder.
    pub async fn open(&mut self) -> Result<()> {
        if self.session.is_some() {
            debug!("Already connected to IMAP server");
            return Ok(());
        }

        if self.config.host.trim().is_empty() || self.config.username.trim().is_empty() {
            return Err(EmailError::ConfigError(
                "mailbox host and username are required".to_string(),
            ));
        }
        let password = self.password()?;

        let tcp_stream = self.connect_tcp().await?;

        let tls = TlsConnector::new();
        let tls_stream = tls
            .connect(&self.config.host, tcp_stream)
            .await
            .map_err(|e| EmailError::TlsError(e.to_string()))?;

        let client = async_imap::Client::new(tls_stream);
        let mut session = client
            .login(&self.config.username, password.expose_secret())
            .await
            .map_err(|(e, _)| EmailError::AuthenticationFailed(e.to_string()))?;
        info!("Authenticated to IMAP server as {}", self.config.username);

        let folder = self.config.folder.clone();
        let mailbox = session.select(&folder).await.map_err(|e| {
            let msg = e.to_string();
            if msg.contains("doesn't exist") || msg.contains("NO") {
                EmailError::FolderNotFound(folder.clone())
            } else {
                EmailError::ProtocolError(msg)
            }
        })?;

        // Some servers omit UIDVALIDITY; bare UIDs are then the key.
        self.uidvalidity = mailbox.uid_validity;
        debug!(
            "Folder '{}' selected (UIDVALIDITY={:?}, {} messages)",
            folder, mailbox.uid_validity, mailbox.exists
        );

        self.session = Some(session);
        Ok(())
    }

    /// Resolves and connects on the blocking pool, off the async workers.
    async fn connect_tcp(&self) -> Result<AsyncTcpStream> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let timeout = Duration::from_secs(self.config.timeout_secs.max(1));
        info!("Connecting to IMAP server at {}", addr);

        let stream = tokio::task::spawn_blocking(move || connect_blocking(&addr, timeout))
            .await
            .map_err(|e| EmailError::ConnectionFailed(format!("connect task failed: {}", e)))??;

        async_io::Async::new(stream).map_err(|e| EmailError::ConnectionFailed(e.to_string()))
    }

    fn password(&self) -> Result<SecretString> {
        if self.config.password.is_some() {
            warn!("Using an inline mailbox password; prefer password_file or password_env_var");
        }
        self.config
            .credential_source()
            .resolve()
            .map_err(|e| EmailError::CredentialsNotFound(e.to_string()))
    }

    fn session(&mut self) -> Result<&mut Session<TlsStream>> {
        self.session
            .as_mut()
            .ok_or_else(|| EmailError::ConnectionFailed("Not connected".to_string()))
    }

    /// UIDVALIDITY of the selected folder, if the server reported one.
    pub fn uidvalidity(&self) -> Option<u32> {
        self.uidvalidity
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

#[async_trait]
impl Mailbox for ImapClient {
    async fn connect(&mut self) -> Result<()> {
        self.open().await
    }

    async fn list_unread(&mut self) -> Result<Vec<u32>> {
        let session = self.session()?;

        let uids = session
            .uid_search("UNSEEN")
            .await
            .map_err(|e| EmailError::ProtocolError(e.to_string()))?;

        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();
        debug!("Found {} unread messages", uid_list.len());
        Ok(uid_list)
    }

    async fn fetch(&mut self, uid: u32) -> Result<Vec<u8>> {
        // BODY[] sets \Seen on the server; PEEK leaves the message unread.
        let query = if self.config.mark_as_read {
            "(UID BODY[])"
        } else {
            "(UID BODY.PEEK[])"
        };
        let session = self.session()?;

        debug!("Fetching message UID {} {}", uid, query);
        let mut messages = session
            .uid_fetch(uid.to_string(), query)
            .await
            .map_err(|e| EmailError::ProtocolError(e.to_string()))?;

        // Drain to the tagged completion so no untagged FETCH (a flag update,
        // a late answer to an earlier command) is left for the next call.
        let mut fetched = Vec::new();
        while let Some(message_result) = messages.next().await {
            match message_result {
                Ok(message) => fetched.push(message),
                Err(e) => warn!("Error fetching message UID {}: {}", uid, e),
            }
        }
        drop(messages);

        body_for_uid(uid, fetched.iter().map(|m| (m.uid, m.body())))
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            info!("Disconnecting from IMAP server");
            session
                .logout()
                .await
                .map_err(|e| EmailError::ProtocolError(e.to_string()))?;
        }
        self.uidvalidity = None;
        Ok(())
    }

    fn abandon(&mut self) {
        if self.session.take().is_some() {
            warn!("Dropping IMAP session without logout");
        }
        self.uidvalidity = None;
    }

    fn external_id(&self, uid: u32) -> String {
        match self.uidvalidity {
            Some(validity) => format!("{}:{}", validity, uid),
            None => uid.to_string(),
        }
    }
}

fn connect_blocking(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let candidates = addr
        .to_socket_addrs()
        .map_err(|e| EmailError::ConnectionFailed(format!("{}: {}", addr, e)))?;

    let mut last_error = None;
    for candidate in candidates {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                last_error = Some(EmailError::Timeout(format!("connect to {}", candidate)));
            }
            Err(e) => {
                last_error = Some(EmailError::ConnectionFailed(format!("{}: {}", candidate, e)));
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        EmailError::ConnectionFailed(format!("{} did not resolve to any address", addr))
    }))
}

/// Body of the FETCH response for `uid`. Responses for other UIDs and
/// responses without a body are ignored.
fn body_for_uid<'a, I>(uid: u32, fetched: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (Option<u32>, Option<&'a [u8]>)>,
{
    let mut found = None;
    for (fetched_uid, body) in fetched {
        match (fetched_uid, body) {
            (Some(u), Some(body)) if u == uid => found = Some(body.to_vec()),
            (other, _) => debug!("Ignoring FETCH response for UID {:?} while fetching {}", other, uid),
        }
    }
    found.ok_or_else(|| EmailError::ProtocolError(format!("Message with UID {} not found", uid)))
}

impl Drop for ImapClient {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("ImapClient dropped without explicit disconnect - session will be closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> MailboxConfig {
        MailboxConfig {
            host: "imap.example.com".to_string(),
            username: "me@example.com".to_string(),
            password_env_var: Some("NOTIA_TEST_IMAP_PASSWORD_UNSET".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_client_creation() {
        let client = ImapClient::new(create_test_config());
        assert!(!client.is_connected());
        assert!(client.uidvalidity().is_none());
    }

    #[test]
    fn test_external_id_includes_uidvalidity() {
        let mut client = ImapClient::new(create_test_config());
        assert_eq!(client.external_id(42), "42");
        client.uidvalidity = Some(7);
        assert_eq!(client.external_id(42), "7:42");
    }

    #[tokio::test]
    async fn test_missing_host_is_config_error() {
        let mut config = create_test_config();
        config.host = String::new();

        let mut client = ImapClient::new(config);
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, EmailError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_unresolvable_credential_fails_before_network() {
        std::env::remove_var("NOTIA_TEST_IMAP_PASSWORD_UNSET");
        let mut client = ImapClient::new(create_test_config());
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, EmailError::CredentialsNotFound(_)));
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_body_for_uid_ignores_other_responses() {
        let stale: &[u8] = b"Subject: four";
        let wanted: &[u8] = b"Subject: five";
        let fetched = vec![
            (Some(4), Some(stale)),
            (Some(5), None),
            (Some(5), Some(wanted)),
            (None, Some(stale)),
        ];
        assert_eq!(body_for_uid(5, fetched).unwrap(), wanted);
    }

    #[test]
    fn test_body_for_uid_without_match_is_error() {
        let stale: &[u8] = b"Subject: four";
        let fetched = vec![(Some(4), Some(stale)), (Some(5), None)];
        assert!(matches!(
            body_for_uid(5, fetched),
            Err(EmailError::ProtocolError(_))
        ));
        assert!(body_for_uid(5, Vec::new()).is_err());
    }

    #[test]
    fn test_abandon_clears_uidvalidity() {
        let mut client = ImapClient::new(create_test_config());
        client.uidvalidity = Some(7);
        client.abandon();
        assert!(!client.is_connected());
        assert_eq!(client.external_id(3), "3");
    }

    #[test]
    fn test_connect_blocking_unresolvable_host() {
        let err = connect_blocking("host.invalid:993", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, EmailError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let mut client = ImapClient::new(create_test_config());
        assert!(matches!(
            client.list_unread().await,
            Err(EmailError::ConnectionFailed(_))
        ));
        assert!(client.disconnect().await.is_ok());
    }
}

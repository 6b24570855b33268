//! In-memory stand-ins for the mailbox and the language model.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use notia::email::EmailError;
use notia::{LanguageModel, Mailbox, ModelError};

/// Unread messages keyed by UID. By default messages stay unread after a
/// fetch, like a session that only peeks.
#[derive(Default)]
pub struct MockMailbox {
    messages: BTreeMap<u32, Vec<u8>>,
    broken: HashSet<u32>,
    hanging: HashSet<u32>,
    seen: HashSet<u32>,
    marks_seen: bool,
    refuse_connect: bool,
    /// Replies to cancelled fetches still pending on the session.
    late_replies: VecDeque<u32>,
    pub connected: bool,
    pub connects: usize,
    pub abandons: usize,
    pub fetched: Vec<u32>,
    pub disconnects: usize,
}

impl MockMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, uid: u32, raw: Vec<u8>) -> Self {
        self.messages.insert(uid, raw);
        self
    }

    /// Fetching this UID fails with a protocol error.
    pub fn with_broken(mut self, uid: u32) -> Self {
        self.broken.insert(uid);
        self
    }

    /// Fetching this UID never completes. Its reply arrives late on the same
    /// session and is what the next fetch receives unless the session is
    /// abandoned first.
    pub fn with_hanging(mut self, uid: u32) -> Self {
        self.hanging.insert(uid);
        self
    }

    /// Successful fetches flag the message as seen.
    pub fn marking_seen(mut self) -> Self {
        self.marks_seen = true;
        self
    }

    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connect = true;
        self
    }
}

#[async_trait]
impl Mailbox for MockMailbox {
    async fn connect(&mut self) -> Result<(), EmailError> {
        if self.refuse_connect {
            return Err(EmailError::AuthenticationFailed("bad password".to_string()));
        }
        self.connected = true;
        self.connects += 1;
        Ok(())
    }

    async fn list_unread(&mut self) -> Result<Vec<u32>, EmailError> {
        let mut uids: Vec<u32> = self.messages.keys().copied().collect();
        uids.extend(self.broken.iter().copied());
        uids.extend(self.hanging.iter().copied());
        uids.retain(|uid| !self.seen.contains(uid));
        uids.sort_unstable();
        uids.dedup();
        Ok(uids)
    }

    async fn fetch(&mut self, uid: u32) -> Result<Vec<u8>, EmailError> {
        if !self.connected {
            return Err(EmailError::ConnectionFailed("Not connected".to_string()));
        }
        self.fetched.push(uid);
        if let Some(late) = self.late_replies.pop_front() {
            return self
                .messages
                .get(&late)
                .cloned()
                .ok_or_else(|| EmailError::ProtocolError(format!("no message {}", late)));
        }
        if self.hanging.contains(&uid) {
            self.late_replies.push_back(uid);
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.broken.contains(&uid) {
            return Err(EmailError::ProtocolError(format!("FETCH {} failed", uid)));
        }
        let raw = self
            .messages
            .get(&uid)
            .cloned()
            .ok_or_else(|| EmailError::ProtocolError(format!("no message {}", uid)))?;
        if self.marks_seen {
            self.seen.insert(uid);
        }
        Ok(raw)
    }

    async fn disconnect(&mut self) -> Result<(), EmailError> {
        self.connected = false;
        self.disconnects += 1;
        Ok(())
    }

    fn abandon(&mut self) {
        self.connected = false;
        self.abandons += 1;
        self.late_replies.clear();
    }

    fn external_id(&self, uid: u32) -> String {
        format!("7:{}", uid)
    }
}

/// Returns a fixed answer and counts calls.
pub struct ScriptedModel {
    answer: Option<String>,
    pub calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Some(answer) => Ok(answer.clone()),
            None => Err(ModelError::Inference("scripted failure".to_string())),
        }
    }
}

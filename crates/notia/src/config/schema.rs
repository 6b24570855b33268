use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::secrets::{expand_home, SecretSource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailbox: Option<MailboxConfig>,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            mailbox: None,
            model: ModelConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Database file, with `~` expanded. Falls back to `~/.notia/data/notia.db`.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        match &self.database_path {
            Some(path) => Some(expand_home(path)),
            None => crate::db::default_database_path(),
        }
    }

    /// The mailbox section, only when it names a host, a user and a credential.
    pub fn ready_mailbox(&self) -> Option<&MailboxConfig> {
        self.mailbox.as_ref().filter(|m| m.is_complete())
    }
}

/// IMAP mailbox settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct MailboxConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_imap_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env_var: Option<String>,
    #[serde(default = "default_folder")]
    pub folder: String,
    /// Upper bound on messages processed per run.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Background polling interval. 0 disables polling.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Timeout applied to each network round-trip.
    #[serde(default = "default_mailbox_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub mark_as_read: bool,
}

impl MailboxConfig {
    pub fn credential_source(&self) -> SecretSource<'_> {
        SecretSource::new(
            self.password.as_deref(),
            self.password_file.as_deref(),
            self.password_env_var.as_deref(),
        )
    }

    pub fn is_complete(&self) -> bool {
        !self.host.trim().is_empty()
            && !self.username.trim().is_empty()
            && self.credential_source().is_configured()
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_imap_port(),
            username: String::new(),
            password: None,
            password_file: None,
            password_env_var: None,
            folder: default_folder(),
            batch_size: default_batch_size(),
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_mailbox_timeout(),
            mark_as_read: true,
        }
    }
}

impl fmt::Debug for MailboxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("password_file", &self.password_file)
            .field("password_env_var", &self.password_env_var)
            .field("folder", &self.folder)
            .field("batch_size", &self.batch_size)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("timeout_secs", &self.timeout_secs)
            .field("mark_as_read", &self.mark_as_read)
            .finish()
    }
}

fn default_imap_port() -> u16 {
    993
}

fn default_folder() -> String {
    "INBOX".to_string()
}

fn default_batch_size() -> usize {
    10
}

fn default_poll_interval() -> u64 {
    300
}

fn default_mailbox_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Which language model runtime answers classification and chat prompts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Built-in keyword heuristic. Needs no model files.
    #[default]
    Keyword,
    /// Local GGUF model through llama.cpp (requires the `ai` feature).
    Llama,
    /// OpenAI-compatible chat completions endpoint.
    Openai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub backend: ModelBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env_var: Option<String>,
    /// Inference timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    64
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::Keyword,
            model_path: None,
            endpoint: None,
            model_name: None,
            api_key_env_var: None,
            timeout_secs: default_model_timeout(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

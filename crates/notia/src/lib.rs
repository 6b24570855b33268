pub mod ai;
pub mod classifier;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod secrets;
pub mod service;

pub use ai::{build_model, KeywordModel, LanguageModel, ModelError};
pub use classifier::Classifier;
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use email::{EmailError, ImapClient, Mailbox, MessageDecoder};
pub use error::{ConfigError, NotiaError, Result};
pub use model::{Category, ClassificationResult, NormalizedMessage, TaskStatus};
pub use pipeline::{IngestedMessage, IngestionPipeline, IngestionSummary, PipelineConfig};
pub use secrets::{resolve_secret, SecretError};
pub use service::{CreateTaskRequest, NotiaService};

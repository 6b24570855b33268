//! The language model seam shared by the classifier and chat.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a language model runtime.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to initialize LLM backend: {0}")]
    BackendInit(String),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Failed to create context: {0}")]
    ContextCreation(String),

    #[error("Failed to tokenize input: {0}")]
    Tokenization(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Model endpoint returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Model did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Invalid model configuration: {0}")]
    Config(String),

    #[error("The '{0}' backend requires building with the \"ai\" feature")]
    NotEnabled(&'static str),

    #[error("Mutex poisoned - concurrent access failed")]
    MutexPoisoned,
}

/// A text-in, text-out model. Implementations must be safe to share
/// between the ingestion pipeline and request handlers.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Runs `generate` under a deadline.
pub async fn generate_with_timeout(
    model: &dyn LanguageModel,
    prompt: &str,
    timeout: Duration,
) -> Result<String, ModelError> {
    match tokio::time::timeout(timeout, model.generate(prompt)).await {
        Ok(result) => result,
        Err(_) => Err(ModelError::Timeout(timeout)),
    }
}

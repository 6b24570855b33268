//! Language model runtimes.
//!
//! The keyword and OpenAI-compatible runtimes are always available. The
//! local llama.cpp runtime is compiled with the "ai" feature flag.

pub mod keyword;
#[cfg(feature = "ai")]
pub mod llama;
pub mod openai;
pub mod runtime;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ModelBackend, ModelConfig};
use crate::secrets::SecretSource;

pub use keyword::KeywordModel;
#[cfg(feature = "ai")]
pub use llama::LocalLlamaModel;
pub use openai::OpenAiModel;
pub use runtime::{generate_with_timeout, LanguageModel, ModelError};

/// Builds the runtime selected by `config.backend`.
pub fn build_model(config: &ModelConfig) -> Result<Arc<dyn LanguageModel>, ModelError> {
    match config.backend {
        ModelBackend::Keyword => Ok(Arc::new(KeywordModel::new())),
        ModelBackend::Llama => {
            let path = config
                .model_path
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ModelError::Config("model_path is required".to_string()))?;
            load_llama(&crate::secrets::expand_home(path), config.max_tokens)
        }
        ModelBackend::Openai => {
            let endpoint = config
                .endpoint
                .as_deref()
                .filter(|e| !e.is_empty())
                .ok_or_else(|| ModelError::Config("endpoint is required".to_string()))?;
            let model_name = config
                .model_name
                .as_deref()
                .filter(|m| !m.is_empty())
                .ok_or_else(|| ModelError::Config("model_name is required".to_string()))?;
            let api_key = SecretSource::new(None, None, config.api_key_env_var.as_deref())
                .resolve_optional()
                .map_err(|e| ModelError::Config(e.to_string()))?;

            let model = OpenAiModel::new(
                endpoint,
                model_name,
                api_key,
                config.max_tokens,
                Duration::from_secs(config.timeout_secs.max(1)),
            )?;
            Ok(Arc::new(model))
        }
    }
}

#[cfg(feature = "ai")]
fn load_llama(path: &Path, max_tokens: u32) -> Result<Arc<dyn LanguageModel>, ModelError> {
    Ok(Arc::new(LocalLlamaModel::load(path, max_tokens)?))
}

#[cfg(not(feature = "ai"))]
fn load_llama(path: &Path, _max_tokens: u32) -> Result<Arc<dyn LanguageModel>, ModelError> {
    log::error!(
        "Cannot load {}: built without the \"ai\" feature",
        path.display()
    );
    Err(ModelError::NotEnabled("llama"))
}

/// Escapes chat-template control sequences in untrusted text before it is
/// embedded in a prompt.
///
/// # Sequences Escaped
/// - `<|...|>` - ChatML special tokens (system, user, assistant markers)
/// - `<s>`, `</s>` - Sequence boundaries
/// - `[INST]`, `[/INST]` - Llama-style instruction markers
pub fn sanitize_for_prompt(text: &str) -> String {
    text.replace("<|", "< |")
        .replace("|>", "| >")
        .replace("<s>", "< s >")
        .replace("</s>", "< / s >")
        .replace("[INST]", "[ INST ]")
        .replace("[/INST]", "[ / INST ]")
}

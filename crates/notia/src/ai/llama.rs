//! Local GGUF model runtime using llama-cpp-2.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::token::data_array::LlamaTokenDataArray;
use log::{debug, info};

use super::runtime::{LanguageModel, ModelError};

const CONTEXT_TOKENS: u32 = 2048;

struct LlamaRuntime {
    model: LlamaModel,
    backend: LlamaBackend,
    ctx_params: LlamaContextParams,
}

// SAFETY: LlamaRuntime is only reachable through the Mutex in LocalLlamaModel.
// Each generation creates its own context, so no llama.cpp state is shared
// between calls.
unsafe impl Send for LlamaRuntime {}
unsafe impl Sync for LlamaRuntime {}

impl LlamaRuntime {
    fn load(model_path: &Path) -> Result<Self, ModelError> {
        info!("Initializing LLM backend...");
        let backend = LlamaBackend::init().map_err(|e| ModelError::BackendInit(e.to_string()))?;

        info!("Loading model from: {}", model_path.display());
        let model_params = LlamaModelParams::default();
        let model = LlamaModel::load_from_file(&backend, model_path, &model_params)
            .map_err(|e| ModelError::ModelLoad(e.to_string()))?;

        let ctx_params =
            LlamaContextParams::default().with_n_ctx(std::num::NonZeroU32::new(CONTEXT_TOKENS));

        info!("LLM initialized successfully");
        Ok(Self {
            model,
            backend,
            ctx_params,
        })
    }

    /// Greedy-ish sampling until end of generation or `max_tokens`.
    fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String, ModelError> {
        let mut ctx = self
            .model
            .new_context(&self.backend, self.ctx_params.clone())
            .map_err(|e| ModelError::ContextCreation(e.to_string()))?;

        let tokens = self
            .model
            .str_to_token(&chatml(prompt), AddBos::Always)
            .map_err(|e| ModelError::Tokenization(e.to_string()))?;

        let n_tokens = tokens.len();
        if n_tokens == 0 || n_tokens >= CONTEXT_TOKENS as usize {
            return Err(ModelError::Tokenization(format!(
                "prompt has {} tokens (context is {})",
                n_tokens, CONTEXT_TOKENS
            )));
        }
        debug!("Tokenized prompt into {} tokens", n_tokens);

        let mut batch = LlamaBatch::new(CONTEXT_TOKENS as usize, 1);
        for (i, token) in tokens.iter().enumerate() {
            let is_last = i == n_tokens - 1;
            batch
                .add(*token, i as i32, &[0], is_last)
                .map_err(|e| ModelError::Inference(format!("Failed to add token: {}", e)))?;
        }

        ctx.decode(&mut batch)
            .map_err(|e| ModelError::Inference(format!("Failed to decode prompt: {}", e)))?;

        let mut output = String::new();
        let mut n_cur = n_tokens;

        for _ in 0..max_tokens {
            let candidates = ctx.candidates_ith(batch.n_tokens() - 1);
            let mut candidates_array = LlamaTokenDataArray::from_iter(candidates, false);

            let seed = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u32)
                .unwrap_or(42);
            let new_token = candidates_array.sample_token(seed);

            if self.model.is_eog_token(new_token) {
                break;
            }

            let token_str = self
                .model
                .token_to_str(new_token, Special::Tokenize)
                .map_err(|e| ModelError::Inference(format!("Failed to decode token: {}", e)))?;
            output.push_str(&token_str);

            batch.clear();
            batch
                .add(new_token, n_cur as i32, &[0], true)
                .map_err(|e| ModelError::Inference(format!("Failed to add token: {}", e)))?;

            ctx.decode(&mut batch)
                .map_err(|e| ModelError::Inference(format!("Failed to decode: {}", e)))?;

            n_cur += 1;
        }

        Ok(output.trim().to_string())
    }
}

/// Wraps a user prompt in the ChatML template used by Qwen-family models.
fn chatml(prompt: &str) -> String {
    format!(
        "<|im_start|>system\nYou are a helpful assistant.<|im_end|>\n\
         <|im_start|>user\n{}<|im_end|>\n<|im_start|>assistant\n",
        prompt
    )
}

/// A GGUF model loaded once and shared across callers.
pub struct LocalLlamaModel {
    runtime: Arc<Mutex<LlamaRuntime>>,
    max_tokens: usize,
}

impl LocalLlamaModel {
    pub fn load(model_path: &Path, max_tokens: u32) -> Result<Self, ModelError> {
        let runtime = LlamaRuntime::load(model_path)?;
        Ok(Self {
            runtime: Arc::new(Mutex::new(runtime)),
            max_tokens: max_tokens as usize,
        })
    }
}

#[async_trait]
impl LanguageModel for LocalLlamaModel {
    fn name(&self) -> &str {
        "llama"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let runtime = Arc::clone(&self.runtime);
        let prompt = prompt.to_string();
        let max_tokens = self.max_tokens;

        // Inference is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || {
            let guard = runtime.lock().map_err(|_| ModelError::MutexPoisoned)?;
            guard.generate(&prompt, max_tokens)
        })
        .await
        .map_err(|e| ModelError::Inference(format!("inference task failed: {}", e)))?
    }
}

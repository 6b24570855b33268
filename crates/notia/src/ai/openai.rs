//! OpenAI-compatible chat completions runtime (Ollama, vLLM, llama-server, ...).

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::runtime::{LanguageModel, ModelError};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageOwned,
}

#[derive(Deserialize)]
struct ChatMessageOwned {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiModel {
    url: String,
    model_name: String,
    api_key: Option<SecretString>,
    max_tokens: u32,
    client: Client,
}

impl OpenAiModel {
    /// `endpoint` is the API base (e.g. `http://localhost:11434/v1`) or the
    /// full `/chat/completions` URL.
    pub fn new(
        endpoint: &str,
        model_name: &str,
        api_key: Option<SecretString>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Http(e.to_string()))?;

        Ok(Self {
            url: completions_url(endpoint),
            model_name: model_name.to_string(),
            api_key,
            max_tokens,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn completions_url(endpoint: &str) -> String {
    let trimmed = endpoint.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{}/chat/completions", trimmed)
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let req = ChatRequest {
            model: &self.model_name,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: 0.0,
        };

        let mut request = self.client.post(&self.url).json(&req);
        if let Some(key) = &self.api_key {
            request = request.header(
                "Authorization",
                format!("Bearer {}", key.expose_secret()),
            );
        }

        let res = request
            .send()
            .await
            .map_err(|e| ModelError::Http(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(ModelError::Api {
                status: status.as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| ModelError::Http(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!("{} answered with {} chars", self.model_name, content.chars().count());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url() {
        assert_eq!(
            completions_url("http://localhost:11434/v1/"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            completions_url("https://api.example.com/v1/chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_shape() {
        let req = ChatRequest {
            model: "qwen2.5",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            max_tokens: 16,
            temperature: 0.0,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "qwen2.5");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 16);
    }

    #[test]
    fn test_response_without_content() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"role": "assistant"}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let model = OpenAiModel::new(
            "http://127.0.0.1:9/v1",
            "m",
            None,
            8,
            Duration::from_secs(2),
        )
        .unwrap();
        let err = model.generate("hi").await.unwrap_err();
        assert!(matches!(err, ModelError::Http(_)));
    }
}

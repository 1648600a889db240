use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use thesis_core::traits::Generator;
use thesis_core::types::GenerationRequest;
use thesis_core::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Hosted chat-completions client (OpenAI or any compatible endpoint).
pub struct OpenAiGenerator {
    api_key: String,
    model: String,
    base_url: String,
    name: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ChatRespChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResp {
    choices: Vec<ChatRespChoice>,
}

impl OpenAiGenerator {
    pub fn new(model: String, api_key: String, base_url: Option<String>) -> Self {
        let name = format!("openai:{model}");
        Self {
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            name,
            client: Client::new(),
        }
    }

    /// Reads `OPENAI_API_KEY`; its absence is a configuration error.
    pub fn from_env(model: String, base_url: Option<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Configuration("OPENAI_API_KEY must be set for the openai generation backend".into()))?;
        Ok(Self::new(model, api_key, base_url))
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": request.prompt }
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "top_p": request.top_p,
        });
        debug!(generator = %self.name, max_tokens = request.max_tokens, "chat completion request");
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::external(&self.name, e))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let txt = resp.text().await.unwrap_or_default();
            return Err(Error::external(&self.name, format!("status {status}: {txt}")));
        }
        let parsed: ChatResp = resp.json().await.map_err(|e| Error::external(&self.name, e))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(content.trim().to_string())
    }
}

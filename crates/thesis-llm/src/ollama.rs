use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use thesis_core::traits::Generator;
use thesis_core::types::GenerationRequest;
use thesis_core::{Error, Result};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Locally hosted model served by Ollama's `/api/chat`.
pub struct OllamaGenerator {
    model: String,
    base_url: String,
    name: String,
    client: Client,
}

impl OllamaGenerator {
    /// `base_url` falls back to `OLLAMA_BASE_URL`, then the default local port.
    pub fn new(model: String, base_url: Option<String>) -> Self {
        let name = format!("ollama:{model}");
        Self {
            model,
            base_url: base_url
                .or_else(|| std::env::var("OLLAMA_BASE_URL").ok())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            name,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": request.prompt }
            ],
            "stream": false,
            "options": {
                "num_predict": request.max_tokens as i64,
                "temperature": request.temperature,
                "top_p": request.top_p,
            }
        });
        debug!(generator = %self.name, max_tokens = request.max_tokens, "ollama chat request");
        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::external(&self.name, e))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let txt = resp.text().await.unwrap_or_default();
            return Err(Error::external(&self.name, format!("status {status}: {txt}")));
        }
        let json: serde_json::Value = resp.json().await.map_err(|e| Error::external(&self.name, e))?;
        let content = json["message"]["content"].as_str().unwrap_or("").trim().to_string();
        Ok(content)
    }
}

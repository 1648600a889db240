use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use thesis_core::config::HttpApi;
use thesis_core::traits::Embedder;
use thesis_core::{Error, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Remote embedding service: OpenAI-compatible `/v1/embeddings` or Ollama `/api/embeddings`.
pub struct HttpEmbedder {
    api: HttpApi,
    model: String,
    base_url: String,
    api_key: Option<String>,
    dim: usize,
    id: String,
    client: Client,
}

/// `dimensions` asks text-embedding-3 models to shorten their output to the
/// configured size instead of their native width.
#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingItem {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// OpenAI requires `OPENAI_API_KEY`; its absence is a configuration error.
    pub fn new(api: HttpApi, model: String, base_url: Option<String>, dim: usize) -> Result<Self> {
        let api_key = match api {
            HttpApi::OpenAi => Some(
                std::env::var("OPENAI_API_KEY")
                    .ok()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| {
                        Error::Configuration("OPENAI_API_KEY must be set for the http embedding backend".into())
                    })?,
            ),
            HttpApi::Ollama => None,
        };
        Self::with_api_key(api, model, base_url, dim, api_key)
    }

    pub fn with_api_key(
        api: HttpApi,
        model: String,
        base_url: Option<String>,
        dim: usize,
        api_key: Option<String>,
    ) -> Result<Self> {
        if dim == 0 {
            return Err(Error::Configuration("embedding.dim must be > 0".into()));
        }
        let default_url = match api { HttpApi::OpenAi => OPENAI_BASE_URL, HttpApi::Ollama => OLLAMA_BASE_URL };
        let base_url = base_url
            .or_else(|| std::env::var("OLLAMA_BASE_URL").ok().filter(|_| api == HttpApi::Ollama))
            .unwrap_or_else(|| default_url.to_string());
        let prefix = match api { HttpApi::OpenAi => "openai", HttpApi::Ollama => "ollama" };
        let id = format!("{prefix}:{model}:d{dim}");
        Ok(Self { api, model, base_url, api_key, dim, id, client: Client::new() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut req = self
            .client
            .post(self.url("/v1/embeddings"))
            .json(&OpenAiEmbeddingRequest { model: &self.model, input: texts, dimensions: self.dim });
        if let Some(key) = &self.api_key { req = req.bearer_auth(key); }
        let resp = req.send().await.map_err(|e| Error::external(&self.id, e))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::external(&self.id, format!("embeddings failed ({status}): {body}")));
        }
        let parsed: OpenAiEmbeddingResponse = resp.json().await.map_err(|e| Error::external(&self.id, e))?;
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    async fn embed_ollama(&self, text: &str) -> Result<Vec<f32>> {
        let resp = self
            .client
            .post(self.url("/api/embeddings"))
            .json(&serde_json::json!({ "model": self.model, "prompt": text }))
            .send()
            .await
            .map_err(|e| Error::external(&self.id, e))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::external(&self.id, format!("embeddings failed ({status}): {body}")));
        }
        let parsed: OllamaEmbeddingResponse = resp.json().await.map_err(|e| Error::external(&self.id, e))?;
        Ok(parsed.embedding)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { 8192 }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(vec![]); }
        let vectors = match self.api {
            HttpApi::OpenAi => self.embed_openai(texts).await?,
            HttpApi::Ollama => {
                let mut out = Vec::with_capacity(texts.len());
                for t in texts { out.push(self.embed_ollama(t).await?); }
                out
            }
        };
        if vectors.len() != texts.len() {
            return Err(Error::external(&self.id, format!("embedder returned {} vectors for {} inputs", vectors.len(), texts.len())));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(Error::external(&self.id, format!("dim mismatch: got {} expected {}", bad.len(), self.dim)));
        }
        Ok(vectors)
    }
}

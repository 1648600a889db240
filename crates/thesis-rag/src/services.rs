//! Explicit service handle shared by every pipeline stage.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thesis_core::config::{GenerationSettings, PipelineSettings, Settings};
use thesis_core::traits::{Embedder, Generator};
use thesis_core::types::GenerationRequest;
use thesis_core::{Error, Result};
use tracing::warn;

/// Embedding model, generation client and call limits.
///
/// Built once at process start and passed around as `Arc<Services>`; tests
/// construct it directly with fake back-ends.
pub struct Services {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    timeout: Duration,
    max_concurrency: usize,
    generation: GenerationSettings,
}

impl Services {
    pub fn new(embedder: Arc<dyn Embedder>, generator: Arc<dyn Generator>) -> Self {
        let pipeline = PipelineSettings::default();
        Self {
            embedder,
            generator,
            timeout: Duration::from_secs(pipeline.timeout_secs),
            max_concurrency: pipeline.max_concurrency,
            generation: GenerationSettings::default(),
        }
    }

    /// Construct both back-ends from configuration. Missing credentials fail here.
    pub fn from_settings(settings: &Settings) -> Result<Arc<Self>> {
        let embedder = thesis_embed::embedder_from_settings(&settings.embedding)?;
        let generator = thesis_llm::generator_from_settings(&settings.generation)?;
        Ok(Arc::new(
            Self::new(embedder, generator)
                .with_pipeline(&settings.pipeline)
                .with_generation(settings.generation.clone()),
        ))
    }

    pub fn with_pipeline(mut self, pipeline: &PipelineSettings) -> Self {
        self.timeout = Duration::from_secs(pipeline.timeout_secs);
        self.max_concurrency = pipeline.max_concurrency.max(1);
        self
    }

    pub fn with_generation(mut self, generation: GenerationSettings) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Shared handle to the embedder, for callers that embed outside `Services`.
    pub fn shared_embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn generation(&self) -> &GenerationSettings {
        &self.generation
    }

    pub fn call_timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `fut` under the per-call timeout; expiry becomes `Error::Timeout`.
    pub async fn with_timeout<T, F>(&self, service: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        call_with_timeout(service, self.timeout, fut).await
    }

    /// One embedding call for the whole batch, under the timeout.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = self.with_timeout(self.embedder.embedder_id(), self.embedder.embed_batch(texts)).await?;
        if vectors.len() != texts.len() {
            return Err(Error::external(
                self.embedder.embedder_id(),
                format!("returned {} vectors for {} inputs", vectors.len(), texts.len()),
            ));
        }
        Ok(vectors)
    }

    pub async fn generate(&self, prompt: String, max_tokens: usize) -> Result<String> {
        let request = GenerationRequest::new(prompt, max_tokens)
            .with_sampling(self.generation.temperature, self.generation.top_p);
        self.with_timeout(self.generator.name(), self.generator.generate(&request)).await
    }
}

async fn call_with_timeout<T, F>(service: &str, timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(res) => res,
        Err(_) => {
            warn!(service, secs = timeout.as_secs(), "external call timed out");
            Err(Error::Timeout { service: service.to_string(), secs: timeout.as_secs() })
        }
    }
}

/// Embedder wrapper that bounds every batch call by a timeout.
///
/// Used where only the embedding model is needed, e.g. corpus ingestion.
pub struct TimedEmbedder {
    inner: Arc<dyn Embedder>,
    timeout: Duration,
}

impl TimedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl Embedder for TimedEmbedder {
    fn embedder_id(&self) -> &str {
        self.inner.embedder_id()
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn max_len(&self) -> usize {
        self.inner.max_len()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        call_with_timeout(self.inner.embedder_id(), self.timeout, self.inner.embed_batch(texts)).await
    }
}

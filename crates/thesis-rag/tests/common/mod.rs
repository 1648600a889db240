#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thesis_core::traits::{Embedder, Generator};
use thesis_core::types::GenerationRequest;
use thesis_core::{Error, Result};
use thesis_embed::{run_blocking, HashEmbedder};
use thesis_rag::Services;

/// Returns its prompt, so tests can see exactly what was sent.
pub struct EchoGenerator {
    pub fail_on: Option<String>,
    pub delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl EchoGenerator {
    pub fn new() -> Self {
        Self {
            fail_on: None,
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(marker: &str) -> Self {
        Self { fail_on: Some(marker.to_string()), ..Self::new() }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay, ..Self::new() }
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(marker) = &self.fail_on {
            if request.prompt.contains(marker.as_str()) {
                return Err(Error::external("echo", "refused"));
            }
        }
        Ok(request.prompt.clone())
    }
}

/// Hash embedder whose batches hold a blocking-pool thread for `delay`,
/// the way local model inference does.
pub struct BlockingEmbedder {
    inner: Arc<HashEmbedder>,
    delay: Duration,
}

impl BlockingEmbedder {
    pub fn new(dim: usize, delay: Duration) -> Self {
        Self { inner: Arc::new(HashEmbedder::new(dim).unwrap()), delay }
    }
}

#[async_trait]
impl Embedder for BlockingEmbedder {
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
        let inner = Arc::clone(&self.inner);
        let texts = texts.to_vec();
        let delay = self.delay;
        run_blocking(self.inner.embedder_id(), move || {
            std::thread::sleep(delay);
            Ok(texts.iter().map(|t| inner.embed_text(t)).collect())
        })
        .await
    }
}

pub fn services_with(generator: Arc<EchoGenerator>) -> Arc<Services> {
    let embedder = Arc::new(HashEmbedder::new(128).unwrap());
    Arc::new(Services::new(embedder, generator))
}

pub fn services() -> Arc<Services> {
    services_with(Arc::new(EchoGenerator::new()))
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

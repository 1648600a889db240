use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::types::GenerationRequest;

/// Sentence embedding model. Deterministic for a fixed model and input.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model, recorded next to persisted vectors.
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// Returns exactly one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Text-in, text-out generation service.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Turns a file into plain text. PDF and other binary formats live outside this workspace.
pub trait TextExtractor: Send + Sync {
    fn supports(&self, path: &Path) -> bool;
    fn extract(&self, path: &Path) -> Result<String>;
}

//! Embedding store: passages and their vectors in lock-step order.

use indicatif::{ProgressBar, ProgressStyle};
use thesis_core::traits::Embedder;
use thesis_core::types::{Passage, Segment};
use thesis_core::{Error, Result};
use tracing::{debug, info};

use crate::flat::fingerprint;

/// Passages and vectors owned together. `passages[i].position == i` and
/// `vectors[i]` is the embedding of `passages[i].text`.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingStore {
    passages: Vec<Passage>,
    vectors: Vec<Vec<f32>>,
    dim: usize,
    embedder_id: String,
}

impl EmbeddingStore {
    pub fn new(dim: usize, embedder_id: impl Into<String>) -> Self {
        Self { passages: Vec::new(), vectors: Vec::new(), dim, embedder_id: embedder_id.into() }
    }

    /// Reassemble a store from persisted parts, rejecting anything out of step.
    pub fn from_parts(passages: Vec<Passage>, vectors: Vec<Vec<f32>>, dim: usize, embedder_id: impl Into<String>) -> Result<Self> {
        if passages.len() != vectors.len() {
            return Err(Error::storage(format!("{} passages but {} vectors", passages.len(), vectors.len())));
        }
        if let Some((i, p)) = passages.iter().enumerate().find(|(i, p)| p.position != *i) {
            return Err(Error::storage(format!("passage at row {i} has position {}", p.position)));
        }
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
            return Err(Error::storage(format!("vector {i} has dim {} expected {dim}", v.len())));
        }
        Ok(Self { passages, vectors, dim, embedder_id: embedder_id.into() })
    }

    /// Embed `segments` and return a fresh store holding them in order.
    pub async fn build(embedder: &dyn Embedder, segments: &[Segment], batch_size: usize) -> Result<Self> {
        let mut store = Self::new(embedder.dim(), embedder.embedder_id());
        store.append(embedder, segments, batch_size).await?;
        Ok(store)
    }

    /// Embed and append `segments`; positions continue from the current length.
    /// Nothing is appended if any batch fails.
    pub async fn append(&mut self, embedder: &dyn Embedder, segments: &[Segment], batch_size: usize) -> Result<()> {
        if embedder.embedder_id() != self.embedder_id {
            return Err(Error::InvalidInput(format!(
                "store was built with '{}' but embedder is '{}'",
                self.embedder_id,
                embedder.embedder_id()
            )));
        }
        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        let vectors = embed(embedder, &texts, batch_size).await?;
        let base = self.passages.len();
        for (offset, (segment, vector)) in segments.iter().zip(vectors).enumerate() {
            self.passages.push(Passage { position: base + offset, source: segment.source.clone(), text: segment.text.clone() });
            self.vectors.push(vector);
        }
        debug!(added = segments.len(), total = self.passages.len(), "appended passages");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn embedder_id(&self) -> &str {
        &self.embedder_id
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn passage(&self, position: usize) -> Option<&Passage> {
        self.passages.get(position)
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.vectors)
    }
}

/// Embed `texts` in batches of `batch_size`, same length and order as the input.
pub async fn embed(embedder: &dyn Embedder, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
    if batch_size == 0 {
        return Err(Error::InvalidInput("embedding batch_size must be > 0".into()));
    }
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    info!(count = texts.len(), embedder = embedder.embedder_id(), "embedding passages");
    let pb = ProgressBar::new(texts.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} passages ({percent}%)") {
        pb.set_style(style.progress_chars("#>-"));
    }
    let mut out = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size) {
        let vectors = embedder.embed_batch(chunk).await?;
        if vectors.len() != chunk.len() {
            pb.abandon();
            return Err(Error::external(
                embedder.embedder_id(),
                format!("returned {} vectors for {} inputs", vectors.len(), chunk.len()),
            ));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != embedder.dim()) {
            pb.abandon();
            return Err(Error::external(embedder.embedder_id(), format!("dim mismatch: got {} expected {}", bad.len(), embedder.dim())));
        }
        out.extend(vectors);
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();
    Ok(out)
}

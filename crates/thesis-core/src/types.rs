//! Domain types shared by the segmenter, store, index and pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type SourceId = String;

/// Source label used when a passage has no known origin.
pub const UNKNOWN_SOURCE: &str = "unknown source";

/// A raw document as returned by the ingestion collaborator.
///
/// - `id`: stable document identity (file stem or title)
/// - `text`: extracted plain text, immutable after ingestion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: SourceId,
    pub text: String,
}

/// A segmented span of one document, not yet placed in a store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    pub source: SourceId,
    pub text: String,
}

/// A passage owned by an embedding store.
///
/// `position` is assigned at insertion and equals the offset of the
/// passage's vector in the store for the store's whole lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Passage {
    pub position: usize,
    pub source: SourceId,
    pub text: String,
}

/// One k-NN answer from a similarity index. `distance` is squared L2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// A passage returned by the retriever together with its distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub passage: Passage,
    pub distance: f32,
}

/// Generated text tagged with the source ids it was derived from.
///
/// The tags are informational; they travel to the generator only as inline
/// `[source]` annotations in the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesis {
    pub text: String,
    pub sources: BTreeSet<SourceId>,
}

/// Parameters of one text generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: usize) -> Self {
        Self { prompt: prompt.into(), max_tokens, temperature: 0.7, top_p: 0.9 }
    }

    pub fn with_sampling(mut self, temperature: f32, top_p: f32) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self
    }
}

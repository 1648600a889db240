//! Query embedding and top-k passage lookup.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thesis_core::types::{Passage, RetrievedPassage, SourceId};
use thesis_core::{Error, Result};
use thesis_vector::FlatL2Index;
use tracing::{debug, warn};

use crate::services::Services;

/// Message shown when a query matches nothing.
pub const NO_RELEVANT_PASSAGES: &str = "No relevant passages found in the documents.";

/// Ranked retrieval output, nearest first. Empty when nothing valid matched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Retrieval {
    hits: Vec<RetrievedPassage>,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn hits(&self) -> &[RetrievedPassage] {
        &self.hits
    }

    pub fn indices(&self) -> Vec<usize> {
        self.hits.iter().map(|h| h.passage.position).collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.hits.iter().map(|h| h.passage.text.clone()).collect()
    }

    pub fn sources(&self) -> Vec<SourceId> {
        self.hits.iter().map(|h| h.passage.source.clone()).collect()
    }

    pub fn into_hits(self) -> Vec<RetrievedPassage> {
        self.hits
    }
}

pub struct Retriever {
    services: Arc<Services>,
    stale_hits: AtomicU64,
}

impl Retriever {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services, stale_hits: AtomicU64::new(0) }
    }

    /// Text handed to the embedder; the subject only enriches the query.
    pub fn query_text(question: &str, subject: Option<&str>) -> String {
        match subject.map(str::trim).filter(|s| !s.is_empty()) {
            Some(subject) => format!("Subject: {subject}\nQuestion: {question}"),
            None => question.to_string(),
        }
    }

    /// Top `k` passages for `question`. Index entries that point past the end
    /// of `passages` are dropped and counted, never returned.
    pub async fn retrieve(
        &self,
        question: &str,
        subject: Option<&str>,
        passages: &[Passage],
        index: &FlatL2Index,
        k: usize,
    ) -> Result<Retrieval> {
        let text = Self::query_text(question, subject);
        let query = self
            .services
            .embed(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::external(self.services.embedder().embedder_id(), "no vector for query"))?;

        let neighbors = index.search(&query, k)?;
        debug!(
            indices = ?neighbors.iter().map(|n| n.index).collect::<Vec<_>>(),
            distances = ?neighbors.iter().map(|n| n.distance).collect::<Vec<_>>(),
            "index candidates"
        );

        let mut seen = HashSet::new();
        let mut hits = Vec::with_capacity(neighbors.len());
        for n in neighbors {
            let Some(passage) = passages.get(n.index) else {
                let total = self.stale_hits.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(index = n.index, passages = passages.len(), total, "index points past passage list; rebuild the index");
                continue;
            };
            if seen.insert(n.index) {
                hits.push(RetrievedPassage { passage: passage.clone(), distance: n.distance });
            }
        }
        if hits.is_empty() {
            debug!("{NO_RELEVANT_PASSAGES}");
        }
        Ok(Retrieval { hits })
    }

    /// Out-of-range index entries dropped since this retriever was created.
    pub fn stale_hits(&self) -> u64 {
        self.stale_hits.load(Ordering::Relaxed)
    }
}

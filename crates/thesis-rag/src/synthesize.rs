//! Source-attributed synthesis, single call or batched reduction.
//!
//! The batched form summarises fixed-size batches, then treats the partial
//! summaries as the next level's passages until one level fits in a single
//! batch. Each partial summary is labelled with the sources it covered, so
//! the final prompt still names every source that made it through.

use std::collections::BTreeSet;

use futures::stream::{self, StreamExt};
use thesis_core::types::{SourceId, Synthesis, UNKNOWN_SOURCE};
use thesis_core::{Error, Result};
use tracing::{debug, info, warn};

use crate::prompts;
use crate::services::Services;

/// One input to a synthesis call: its bracketed label, text and covered sources.
#[derive(Debug, Clone)]
struct Item {
    label: String,
    text: String,
    sources: BTreeSet<SourceId>,
}

/// A batch that failed during a batched run and was left out of fusion.
#[derive(Debug)]
pub struct BatchFailure {
    pub level: usize,
    pub batch: usize,
    pub sources: BTreeSet<SourceId>,
    pub error: Error,
}

#[derive(Debug)]
pub struct BatchedSynthesis {
    pub synthesis: Synthesis,
    /// Reduction levels run before the final call; 0 when everything fit in one batch.
    pub levels: usize,
    pub failures: Vec<BatchFailure>,
}

/// Synthesise `passages` in one generation call. Missing or short `sources`
/// fall back to the unknown-source label, which is not reported as a source.
pub async fn synthesize(services: &Services, passages: &[String], sources: Option<&[SourceId]>) -> Result<Synthesis> {
    synthesize_items(services, &label_items(passages, sources)?).await
}

/// Synthesise any number of passages, `batch_size` per generation call.
pub async fn batch_synthesize(
    services: &Services,
    passages: &[String],
    sources: Option<&[SourceId]>,
    batch_size: usize,
) -> Result<BatchedSynthesis> {
    if batch_size < 2 {
        return Err(Error::InvalidInput(format!("synthesis batch size must be at least 2 (got {batch_size})")));
    }
    let mut items = label_items(passages, sources)?;
    let mut failures = Vec::new();
    let mut level = 0;

    while items.len() > batch_size {
        let batches: Vec<&[Item]> = items.chunks(batch_size).collect();
        info!(level, items = items.len(), batches = batches.len(), "synthesising batch level");
        let results: Vec<Result<Synthesis>> = stream::iter(batches.iter().map(|batch| synthesize_items(services, batch)))
            .buffered(services.max_concurrency())
            .collect()
            .await;

        let mut next = Vec::with_capacity(results.len());
        for (i, (batch, result)) in batches.iter().zip(results).enumerate() {
            let covered: BTreeSet<SourceId> = batch.iter().flat_map(|it| it.sources.iter().cloned()).collect();
            match result {
                Ok(partial) => {
                    let names = if covered.is_empty() {
                        UNKNOWN_SOURCE.to_string()
                    } else {
                        covered.iter().cloned().collect::<Vec<_>>().join(", ")
                    };
                    let label = format!("partial summary {}: {names}", next.len() + 1);
                    next.push(Item { label, text: partial.text, sources: covered });
                }
                Err(error) => {
                    warn!(level, batch = i, error = %error, "batch synthesis failed; excluded from fusion");
                    failures.push(BatchFailure { level, batch: i, sources: covered, error });
                }
            }
        }
        if next.is_empty() {
            let last = failures.pop().map(|f| f.error);
            return Err(last.unwrap_or_else(|| Error::InvalidInput("no batches to synthesise".into())));
        }
        items = next;
        level += 1;
    }

    let synthesis = synthesize_items(services, &items).await?;
    debug!(levels = level, failures = failures.len(), sources = synthesis.sources.len(), "synthesis complete");
    Ok(BatchedSynthesis { synthesis, levels: level, failures })
}

fn label_items(passages: &[String], sources: Option<&[SourceId]>) -> Result<Vec<Item>> {
    if passages.is_empty() {
        return Err(Error::InvalidInput("nothing to synthesise".into()));
    }
    Ok(passages
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let label = prompts::source_label(sources, i);
            let covered = if label == UNKNOWN_SOURCE { BTreeSet::new() } else { BTreeSet::from([label.clone()]) };
            Item { sources: covered, label, text: text.clone() }
        })
        .collect())
}

async fn synthesize_items(services: &Services, items: &[Item]) -> Result<Synthesis> {
    let labelled: Vec<(String, String)> = items.iter().map(|it| (it.label.clone(), it.text.clone())).collect();
    let prompt = prompts::synthesis(&labelled);
    let text = services.generate(prompt, services.generation().synthesis_max_tokens).await?;
    let sources = items.iter().flat_map(|it| it.sources.iter().cloned()).collect();
    Ok(Synthesis { text, sources })
}

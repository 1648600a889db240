use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use thesis_core::traits::Embedder;
use thesis_embed::embedder_from_settings;
use thesis_rag::TimedEmbedder;
use thesis_text::data_processor::SegmentingConfig;
use thesis_text::DataProcessor;
use thesis_vector::{save_corpus, Corpus, EmbeddingStore, FlatL2Index};
use tracing::info;

use super::Context;

pub async fn handle_ingest(ctx: &Context, dir: Option<PathBuf>, limit: Option<usize>) -> Result<()> {
    let data_dir = dir.unwrap_or_else(|| ctx.raw_dir());
    let embedder = embedder_from_settings(&ctx.settings.embedding)?;
    let corpus = build_corpus(ctx, &data_dir, limit, embedder).await?;

    let documents: BTreeSet<&str> = corpus.store.passages().iter().map(|p| p.source.as_str()).collect();
    println!("Ingested {} passages from {} documents", corpus.meta.passage_count, documents.len());
    println!("Embedder: {} (dim {})", corpus.meta.embedder_id, corpus.meta.dim);
    println!("Snapshot: {}", ctx.corpus_dir().display());
    Ok(())
}

/// Segment, embed and index `data_dir`, then save the snapshot to the corpus dir.
pub async fn build_corpus(
    ctx: &Context,
    data_dir: &Path,
    limit: Option<usize>,
    embedder: Arc<dyn Embedder>,
) -> Result<Corpus> {
    let settings = &ctx.settings;
    info!(dir = %data_dir.display(), "ingesting documents");

    let processor = DataProcessor::new(SegmentingConfig {
        min_length: settings.segment.min_length,
        clean: settings.segment.clean,
    });
    let segments = match limit {
        Some(limit) => processor.process_directory_limited(data_dir, limit)?,
        None => processor.process_directory(data_dir)?,
    };
    if segments.is_empty() {
        bail!("no passages found under {}", data_dir.display());
    }

    let embedder = TimedEmbedder::new(embedder, Duration::from_secs(settings.pipeline.timeout_secs));
    let store = EmbeddingStore::build(&embedder, &segments, settings.embedding.batch_size).await?;
    let index = FlatL2Index::from_store(&store)?;

    let corpus_dir = ctx.corpus_dir();
    let meta = save_corpus(&corpus_dir, &store, &index)
        .await
        .with_context(|| format!("saving corpus to {}", corpus_dir.display()))?;
    Ok(Corpus { store, index, meta })
}

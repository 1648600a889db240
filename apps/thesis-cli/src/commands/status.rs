use anyhow::Result;
use thesis_vector::read_snapshot_meta;

use super::Context;

pub async fn handle_status(ctx: &Context) -> Result<()> {
    let dir = ctx.corpus_dir();
    println!("Corpus: {}", dir.display());
    match read_snapshot_meta(&dir).await {
        Ok(meta) => {
            println!("Passages: {}", meta.passage_count);
            println!("Embedder: {} (dim {})", meta.embedder_id, meta.dim);
            println!("Fingerprint: {}", meta.fingerprint);
            println!("Saved at: {}", meta.saved_at.to_rfc3339());
        }
        Err(e) => println!("No usable snapshot: {e}"),
    }
    let s = &ctx.settings;
    println!("Embedding backend: {:?}", s.embedding.backend);
    println!("Generation backend: {:?} ({})", s.generation.backend, s.generation.model);
    println!(
        "Pipeline: top_k={} batch_size={} max_concurrency={} timeout={}s",
        s.pipeline.top_k, s.pipeline.batch_size, s.pipeline.max_concurrency, s.pipeline.timeout_secs
    );
    Ok(())
}

use anyhow::Result;
use thesis_rag::{batch_synthesize, coverage_score, reformulate_all, Retriever, DEFAULT_STYLE, NO_RELEVANT_PASSAGES};
use tracing::warn;

use super::{open_pipeline, Context};

pub async fn handle_ask(
    ctx: &Context,
    question: &str,
    subject: Option<&str>,
    top_k: Option<usize>,
    no_reformulate: bool,
) -> Result<()> {
    let (corpus, services) = open_pipeline(ctx).await?;
    let retriever = Retriever::new(services.clone());
    let k = ctx.top_k(top_k);

    let retrieval = retriever.retrieve(question, subject, corpus.store.passages(), &corpus.index, k).await?;
    if retrieval.is_empty() {
        println!("{NO_RELEVANT_PASSAGES}");
        return Ok(());
    }

    println!("--- Top passages ---");
    for (i, hit) in retrieval.hits().iter().enumerate() {
        println!("[{}] ({}, d={:.4}) {}\n", i + 1, hit.passage.source, hit.distance, hit.passage.text);
    }

    let texts = retrieval.texts();
    if !no_reformulate {
        println!("--- Reformulations ---");
        for (i, result) in reformulate_all(&services, &texts, DEFAULT_STYLE).await.into_iter().enumerate() {
            match result {
                Ok(text) => println!("[{}] {text}\n", i + 1),
                Err(e) => println!("[{}] reformulation failed: {e}\n", i + 1),
            }
        }
    }

    let sources = retrieval.sources();
    let batched = batch_synthesize(&services, &texts, Some(&sources), ctx.settings.pipeline.batch_size).await?;
    for failure in &batched.failures {
        warn!(level = failure.level, batch = failure.batch, error = %failure.error, "batch left out of synthesis");
    }
    println!("--- Synthesis ---");
    println!("{}\n", batched.synthesis.text);

    let coverage = coverage_score(&services, &batched.synthesis.text, &texts).await?;
    println!("Coverage score: {coverage:.2}");
    Ok(())
}

use std::path::Path;

use anyhow::{Context as _, Result};
use thesis_rag::{evaluate, EvalCase, Retriever};

use super::{open_pipeline, Context};

pub async fn handle_evaluate(ctx: &Context, truth: &Path, top_k: Option<usize>) -> Result<()> {
    let raw = std::fs::read_to_string(truth).with_context(|| format!("reading {}", truth.display()))?;
    let cases: Vec<EvalCase> = serde_json::from_str(&raw).with_context(|| format!("parsing {}", truth.display()))?;

    let (corpus, services) = open_pipeline(ctx).await?;
    let retriever = Retriever::new(services);
    let k = ctx.top_k(top_k);
    let report = evaluate(&retriever, corpus.store.passages(), &corpus.index, &cases, k).await?;

    for case in &report.cases {
        println!("Precision@{k}: {:.2}, Recall@{k}: {:.2}  {}", case.precision, case.recall, case.question);
    }
    println!("Mean precision@{k}: {:.2}, mean recall@{k}: {:.2}", report.mean_precision, report.mean_recall);
    if retriever.stale_hits() > 0 {
        println!("{} stale index entries were skipped; re-run `thesis ingest`", retriever.stale_hits());
    }
    Ok(())
}

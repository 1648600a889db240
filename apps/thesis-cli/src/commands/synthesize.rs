use std::path::PathBuf;

use anyhow::{Context as _, Result};
use thesis_core::types::Synthesis;
use thesis_rag::{batch_synthesize, Retriever, NO_RELEVANT_PASSAGES};

use super::{open_pipeline, Context};

pub async fn handle_synthesize(
    ctx: &Context,
    question: &str,
    subject: Option<&str>,
    top_k: Option<usize>,
    out: PathBuf,
    title: &str,
    author: &str,
) -> Result<()> {
    let (corpus, services) = open_pipeline(ctx).await?;
    let retriever = Retriever::new(services.clone());

    let retrieval = retriever
        .retrieve(question, subject, corpus.store.passages(), &corpus.index, ctx.top_k(top_k))
        .await?;
    if retrieval.is_empty() {
        println!("{NO_RELEVANT_PASSAGES}");
        return Ok(());
    }

    let batched = batch_synthesize(
        &services,
        &retrieval.texts(),
        Some(&retrieval.sources()),
        ctx.settings.pipeline.batch_size,
    )
    .await?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(&out, render_report(title, author, &batched.synthesis))
        .with_context(|| format!("writing {}", out.display()))?;
    println!("Synthesis written to {}", out.display());
    Ok(())
}

/// Plain-text report: title and author header, body, then the cited sources.
pub fn render_report(title: &str, author: &str, synthesis: &Synthesis) -> String {
    let mut report = format!("{title}\n{author}\n\n{}\n", synthesis.text.trim());
    if !synthesis.sources.is_empty() {
        report.push_str("\nSources:\n");
        for source in &synthesis.sources {
            report.push_str(&format!("- {source}\n"));
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_has_header_body_and_sources() {
        let synthesis = Synthesis {
            text: "  Soil loss follows rain [doc1].  ".into(),
            sources: ["doc1".to_string(), "doc2".to_string()].into_iter().collect(),
        };
        let report = render_report("Erosion", "A. Student", &synthesis);
        assert_eq!(report, "Erosion\nA. Student\n\nSoil loss follows rain [doc1].\n\nSources:\n- doc1\n- doc2\n");
    }
}

//! Retrieval evaluation against hand-labelled relevance sets.

use serde::{Deserialize, Serialize};
use thesis_core::types::Passage;
use thesis_core::Result;
use thesis_vector::FlatL2Index;
use tracing::info;

use crate::coverage::precision_recall_at_k;
use crate::retriever::Retriever;

/// One labelled question: passage positions a reader judged relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalCase {
    pub question: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub relevant: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseScore {
    pub question: String,
    pub predicted: Vec<usize>,
    pub precision: f64,
    pub recall: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub k: usize,
    pub cases: Vec<CaseScore>,
    pub mean_precision: f64,
    pub mean_recall: f64,
}

/// Retrieve each case at `k` and score it with precision/recall@k.
pub async fn evaluate(
    retriever: &Retriever,
    passages: &[Passage],
    index: &FlatL2Index,
    cases: &[EvalCase],
    k: usize,
) -> Result<EvalReport> {
    let mut scores = Vec::with_capacity(cases.len());
    for case in cases {
        let retrieval = retriever.retrieve(&case.question, case.subject.as_deref(), passages, index, k).await?;
        let predicted = retrieval.indices();
        let (precision, recall) = precision_recall_at_k(&predicted, &case.relevant, k);
        scores.push(CaseScore { question: case.question.clone(), predicted, precision, recall });
    }
    let n = scores.len().max(1) as f64;
    let mean_precision = scores.iter().map(|s| s.precision).sum::<f64>() / n;
    let mean_recall = scores.iter().map(|s| s.recall).sum::<f64>() / n;
    info!(cases = scores.len(), k, mean_precision, mean_recall, "evaluation finished");
    Ok(EvalReport { k, cases: scores, mean_precision, mean_recall })
}

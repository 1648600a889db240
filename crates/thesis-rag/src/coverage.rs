//! Offline retrieval metrics and synthesis coverage.

use std::collections::HashSet;

use thesis_core::Result;

use crate::services::Services;

/// Precision and recall of the first `k` predicted indices against `relevant`.
/// Both sides are treated as sets; an empty side scores 0.
pub fn precision_recall_at_k(predicted: &[usize], relevant: &[usize], k: usize) -> (f64, f64) {
    let top_k: HashSet<usize> = predicted.iter().take(k).copied().collect();
    let relevant: HashSet<usize> = relevant.iter().copied().collect();
    let tp = top_k.intersection(&relevant).count() as f64;
    let precision = if top_k.is_empty() { 0.0 } else { tp / top_k.len() as f64 };
    let recall = if relevant.is_empty() { 0.0 } else { tp / relevant.len() as f64 };
    (precision, recall)
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

/// Mean cosine similarity between `synthesis` and each passage.
///
/// Everything is embedded in one batch so all vectors come from the same
/// model state. Returns 0 when there are no passages.
pub async fn coverage_score(services: &Services, synthesis: &str, passages: &[String]) -> Result<f32> {
    if passages.is_empty() {
        return Ok(0.0);
    }
    let mut texts = Vec::with_capacity(passages.len() + 1);
    texts.push(synthesis.to_string());
    texts.extend(passages.iter().cloned());
    let vectors = services.embed(&texts).await?;
    let (head, rest) = vectors.split_at(1);
    let total: f32 = rest.iter().map(|v| cosine(&head[0], v)).sum();
    Ok(total / rest.len() as f32)
}

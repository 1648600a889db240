//! Per-passage academic paraphrasing.

use futures::stream::{self, StreamExt};
use thesis_core::Result;
use tracing::{debug, warn};

use crate::prompts;
use crate::services::Services;

pub const DEFAULT_STYLE: &str = "academic";

/// Paraphrase one passage in `style`, bounded by `generation.reformulate_max_tokens`.
pub async fn reformulate(services: &Services, text: &str, style: &str) -> Result<String> {
    let prompt = prompts::reformulation(text, style);
    services.generate(prompt, services.generation().reformulate_max_tokens).await
}

/// Paraphrase every passage with at most `max_concurrency` calls in flight.
/// Output order matches input order; a failure affects only its own slot.
pub async fn reformulate_all(services: &Services, texts: &[String], style: &str) -> Vec<Result<String>> {
    let results: Vec<Result<String>> = stream::iter(texts.iter().map(|text| reformulate(services, text, style)))
        .buffered(services.max_concurrency())
        .collect()
        .await;
    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        warn!(failed, total = texts.len(), "some reformulations failed");
    } else {
        debug!(total = texts.len(), "reformulated passages");
    }
    results
}

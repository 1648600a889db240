//! thesis-embed
//!
//! Sentence embedding back-ends behind `thesis_core::traits::Embedder`:
//! a local candle model, a remote HTTP service, and a deterministic hasher.

use std::sync::Arc;

use thesis_core::config::{EmbeddingBackend, EmbeddingSettings};
use thesis_core::traits::Embedder;
use thesis_core::{Error, Result};
use tracing::info;

pub mod device;
pub mod hash;
pub mod http;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use hash::HashEmbedder;
pub use http::HttpEmbedder;
pub use model::XlmRobertaEmbedder;
pub use pool::masked_mean_l2;

/// Run CPU-bound embedding work on tokio's blocking pool.
///
/// The calling task stays responsive, so a timeout around the returned
/// future fires on schedule. The work itself runs to completion regardless.
pub async fn run_blocking<T, F>(service: &str, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::external(service, format!("embedding task failed: {e}")))?
}

/// True when `APP_USE_FAKE_EMBEDDINGS` is `1` or `true`.
pub fn fake_embeddings_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Build the embedder selected by configuration. Constructed once per process.
pub fn embedder_from_settings(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let backend = if fake_embeddings_requested() { EmbeddingBackend::Hash } else { settings.backend };
    match backend {
        EmbeddingBackend::Hash => {
            info!(dim = settings.dim, "using hash embedder");
            Ok(Arc::new(HashEmbedder::new(settings.dim)?))
        }
        EmbeddingBackend::Local => Ok(Arc::new(XlmRobertaEmbedder::new(settings.model_dir.as_deref(), settings.max_len)?)),
        EmbeddingBackend::Http => Ok(Arc::new(HttpEmbedder::new(
            settings.api,
            settings.model.clone(),
            settings.base_url.clone(),
            settings.dim,
        )?)),
    }
}

//! thesis-llm
//!
//! Text generation back-ends behind `thesis_core::traits::Generator`.

use std::sync::Arc;

use thesis_core::config::{GenerationBackend, GenerationSettings};
use thesis_core::traits::Generator;
use thesis_core::Result;
use tracing::info;

pub mod ollama;
pub mod openai;

pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;

/// Build the generator selected by configuration. Missing credentials fail here.
pub fn generator_from_settings(settings: &GenerationSettings) -> Result<Arc<dyn Generator>> {
    let generator: Arc<dyn Generator> = match settings.backend {
        GenerationBackend::OpenAi => Arc::new(OpenAiGenerator::from_env(settings.model.clone(), settings.base_url.clone())?),
        GenerationBackend::Ollama => Arc::new(OllamaGenerator::new(settings.model.clone(), settings.base_url.clone())),
    };
    info!(generator = generator.name(), "generation backend ready");
    Ok(generator)
}

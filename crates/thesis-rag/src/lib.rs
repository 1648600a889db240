//! thesis-rag
//!
//! Retrieval-augmented synthesis over a loaded corpus: retrieval,
//! reformulation, batched synthesis and coverage scoring, all driven through
//! one [`Services`] handle.

pub mod coverage;
pub mod evaluate;
pub mod prompts;
pub mod reformulate;
pub mod retriever;
pub mod services;
pub mod synthesize;

pub use coverage::{coverage_score, precision_recall_at_k};
pub use evaluate::{evaluate, EvalCase, EvalReport};
pub use reformulate::{reformulate, reformulate_all, DEFAULT_STYLE};
pub use retriever::{Retrieval, Retriever, NO_RELEVANT_PASSAGES};
pub use services::{Services, TimedEmbedder};
pub use synthesize::{batch_synthesize, synthesize, BatchFailure, BatchedSynthesis};
